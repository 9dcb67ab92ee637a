//! Core storage engine traits.
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - A read view or a write batch
//! - [`Cursor`] - Ordered iteration over key-value pairs
//!
//! A read transaction is a snapshot: every `get` and cursor opened from it sees the
//! engine as it was when the transaction began. A write transaction stages `put`s
//! which become visible atomically on [`Transaction::commit`], or are discarded on
//! [`Transaction::rollback`] or drop.

use std::sync::Arc;

use super::StorageError;

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that return a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// A storage engine that provides transactional key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`); a single engine is shared
/// by every request handler.
///
/// # Example
///
/// ```ignore
/// use twowaykv_storage::{StorageEngine, Transaction};
///
/// fn example<E: StorageEngine>(engine: &E) -> Result<(), StorageError> {
///     let tx = engine.begin_read()?;
///     let value = tx.get("k2v", b"key")?;
///
///     let mut tx = engine.begin_write()?;
///     tx.put("k2v", b"key", b"17")?;
///     tx.commit()?;
///     Ok(())
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction.
    ///
    /// Read transactions provide a consistent snapshot of the database.
    /// Multiple read transactions can run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// Write transactions may be serialized by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Flush any buffered data to durable storage.
    ///
    /// The default implementation does nothing, as most backends handle durability
    /// on commit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the flush fails.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A read view or write batch over one engine instance.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a table.
    ///
    /// Returns `Ok(None)` if the key (or the whole table) does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the backend fails to read.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stage a key-value pair into a table.
    ///
    /// If the key already exists, its value is replaced when the transaction commits.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read transaction, or
    /// [`StorageError::Internal`] if the backend rejects the write.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Create a cursor over all key-value pairs in a table.
    ///
    /// The cursor starts unpositioned; use [`Cursor::seek`] or [`Cursor::seek_first`]
    /// (or [`Cursor::next`], which starts from the first key).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot open the table.
    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError>;

    /// Commit the transaction, making all staged writes durable at once.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the commit fails; in that case none
    /// of the staged writes are visible.
    fn commit(self) -> Result<(), StorageError>;

    /// Discard the transaction and every staged write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the rollback fails.
    fn rollback(self) -> Result<(), StorageError>;

    /// Check if this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// A cursor for ordered iteration over key-value pairs.
///
/// Keys are ordered lexicographically by byte.
///
/// ```ignore
/// let mut cursor = tx.cursor("k2v")?;
/// let mut entry = cursor.seek(b"https://")?;
/// while let Some((key, value)) = entry {
///     if !key.starts_with(b"https://") {
///         break;
///     }
///     entry = cursor.next()?;
/// }
/// ```
pub trait Cursor {
    /// Seek to the first key greater than or equal to the given key.
    ///
    /// Returns `None` if no such key exists.
    fn seek(&mut self, key: &[u8]) -> CursorResult;

    /// Seek to the first key-value pair, or `None` if the table is empty.
    fn seek_first(&mut self) -> CursorResult;

    /// Move to the next key-value pair, or `None` at the end.
    fn next(&mut self) -> CursorResult;

    /// Get the current key-value pair without advancing.
    ///
    /// Returns `None` if the cursor is not positioned at a valid entry.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// Shared ownership of an engine is still an engine.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_write()
    }

    fn flush(&self) -> Result<(), StorageError> {
        (**self).flush()
    }
}
