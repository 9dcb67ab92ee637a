//! Prefix search over keys.

use tracing::debug;
use twowaykv_storage::{Cursor, StorageEngine, Transaction};

use crate::codec::{decode_key, decode_value};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::index::{tables, BidirectionalIndex};

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Return every entry whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty prefix, or an engine/decoding error.
    pub fn search_by_prefix(&self, prefix: &str) -> Result<Vec<Entry>> {
        if prefix.is_empty() {
            return Err(Error::validation("prefix must not be empty"));
        }

        let view = self.forward().begin_read()?;
        let mut cursor = view.cursor(tables::FORWARD)?;
        let mut entries = Vec::new();

        let mut current = cursor.seek(prefix.as_bytes())?;
        while let Some((raw_key, raw_value)) = current {
            if !raw_key.starts_with(prefix.as_bytes()) {
                break;
            }
            let value = decode_value(&raw_value)?;
            entries.push(Entry::new(decode_key(raw_key)?, value));
            current = cursor.next()?;
        }

        debug!(prefix, matches = entries.len(), "prefix search");
        Ok(entries)
    }
}
