//! Error types for `twowaykv`.
//!
//! This module provides the [`enum@Error`] type that represents all possible errors
//! when using the index.

use thiserror::Error;
use twowaykv_storage::StorageError;

/// Errors that can occur when using a [`BidirectionalIndex`](crate::BidirectionalIndex).
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration error occurred.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller input was rejected before touching storage.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The key already has a value.
    #[error("Key {key} already exists in DB")]
    AlreadyExists {
        /// The existing key.
        key: String,
    },

    /// No free value was found within the allocation attempt budget.
    #[error("could not allocate a unique value for key '{key}' after {attempts} attempts")]
    CollisionExhaustion {
        /// The key that could not be assigned a value.
        key: String,
        /// Attempts made before giving up.
        attempts: u64,
    },

    /// Sampling ran out of seek attempts before collecting enough entries.
    #[error("max collisions reached: found {found} of {requested} entries after {tries} tries")]
    MaxCollisions {
        /// Entries requested.
        requested: usize,
        /// Distinct entries collected before giving up.
        found: usize,
        /// Seeks performed.
        tries: usize,
    },

    /// A storage error occurred.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored bytes did not decode as a key or value.
    #[error("corrupt entry: {0}")]
    Corrupt(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl Error {
    /// Returns `true` if the caller sent input that can never succeed as-is.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` if this error concerns a single key and leaves the rest of a
    /// batch unaffected.
    #[must_use]
    pub const fn is_per_key(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::CollisionExhaustion { .. })
    }

    /// Returns `true` if this is a storage error.
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Create a config error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a corruption error.
    #[must_use]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// A specialized Result type for index operations.
pub type Result<T> = std::result::Result<T, Error>;
