//! The key/value pair exchanged with callers.

use serde::{Deserialize, Serialize};

/// A key together with the value assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// The caller-supplied key.
    pub key: String,
    /// The randomly allocated value.
    pub value: u64,
}

impl Entry {
    /// Create an entry.
    pub fn new(key: impl Into<String>, value: u64) -> Self {
        Self { key: key.into(), value }
    }
}
