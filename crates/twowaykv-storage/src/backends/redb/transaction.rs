//! Redb transaction implementation.
//!
//! [`RedbTransaction`] wraps both read-only and read-write Redb transactions behind
//! the [`Transaction`] trait.
//!
//! # Streaming Cursors
//!
//! Cursors never materialize a whole table. They load entries in batches and fetch
//! the next batch on demand as the cursor advances. A `seek` loads only a short
//! batch, because the common caller positions once and reads one entry.

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, StorageError, Transaction};

use super::tables::{decode_key, encode_key, table_end_key, DATA_TABLE};

/// Default batch size for sequential cursor reads.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Batch size loaded by a `seek`.
const SEEK_BATCH_SIZE: usize = 16;

/// A transaction for the Redb storage engine.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

impl RedbTransaction {
    /// Create a new read-only transaction.
    pub const fn new_read(tx: ReadTransaction) -> Self {
        Self::Read(tx)
    }

    /// Create a new read-write transaction.
    pub const fn new_write(tx: WriteTransaction) -> Self {
        Self::Write(tx)
    }

    /// Fetch up to `limit` entries of `table` starting at `from`.
    ///
    /// When `exclusive` is set, an entry whose key equals `from` is skipped.
    fn fetch_batch(
        &self,
        table: &str,
        from: &[u8],
        exclusive: bool,
        limit: usize,
    ) -> Result<Vec<KeyValue>, StorageError> {
        let start = encode_key(table, from);
        let end = table_end_key(table);
        let skip = exclusive.then_some(from);

        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => scan_table(&t, &start, &end, skip, limit),
                // No data table means no data, which is not an error
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                scan_table(&t, &start, &end, skip, limit)
            }
        }
    }
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded_key = encode_key(table, key);

        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => read_value(&t, &encoded_key),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                read_value(&t, &encoded_key)
            }
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                t.insert(encoded_key.as_slice(), value).map_err(internal)?;
                Ok(())
            }
        }
    }

    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, table.to_string(), DEFAULT_BATCH_SIZE))
    }

    fn commit(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn rollback(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.abort().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

fn internal(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn read_value<T>(table: &T, encoded_key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    match table.get(encoded_key) {
        Ok(Some(value)) => Ok(Some(value.value().to_vec())),
        Ok(None) => Ok(None),
        Err(e) => Err(internal(e)),
    }
}

fn scan_table<T>(
    table: &T,
    start: &[u8],
    end: &[u8],
    skip: Option<&[u8]>,
    limit: usize,
) -> Result<Vec<KeyValue>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut entries = Vec::with_capacity(limit.min(1024));
    let range = table.range(start..end).map_err(internal)?;

    for result in range {
        if entries.len() >= limit {
            break;
        }

        let (k, v) = result.map_err(internal)?;
        if let Some((_, original_key)) = decode_key(k.value()) {
            if skip == Some(original_key) {
                continue;
            }
            entries.push((original_key.to_vec(), v.value().to_vec()));
        }
    }

    Ok(entries)
}

/// A forward cursor over one logical table of a [`RedbTransaction`].
///
/// At any time the cursor holds at most one batch of entries in memory.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    table: String,
    batch: Vec<KeyValue>,
    /// Position within `batch`; `None` when unpositioned or exhausted.
    position: Option<usize>,
    batch_size: usize,
    /// Whether entries may exist after the current batch.
    has_more: bool,
    started: bool,
}

impl<'a> RedbCursor<'a> {
    /// Create an unpositioned cursor.
    pub fn new(tx: &'a RedbTransaction, table: String, batch_size: usize) -> Self {
        Self {
            tx,
            table,
            batch: Vec::new(),
            position: None,
            batch_size: batch_size.max(1),
            has_more: false,
            started: false,
        }
    }

    /// Replace the current batch with entries starting at `from`.
    fn load(&mut self, from: &[u8], exclusive: bool, limit: usize) -> CursorResult {
        self.started = true;
        self.batch = self.tx.fetch_batch(&self.table, from, exclusive, limit)?;
        self.has_more = self.batch.len() >= limit;
        self.position = if self.batch.is_empty() { None } else { Some(0) };
        Ok(self.current_owned())
    }

    fn current_owned(&self) -> Option<KeyValue> {
        self.position.and_then(|pos| self.batch.get(pos).cloned())
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> CursorResult {
        self.load(key, false, SEEK_BATCH_SIZE.min(self.batch_size))
    }

    fn seek_first(&mut self) -> CursorResult {
        self.load(&[], false, self.batch_size)
    }

    fn next(&mut self) -> CursorResult {
        if !self.started {
            return self.seek_first();
        }

        let Some(pos) = self.position else {
            return Ok(None);
        };

        if pos + 1 < self.batch.len() {
            self.position = Some(pos + 1);
            return Ok(self.current_owned());
        }

        if !self.has_more {
            self.position = None;
            return Ok(None);
        }

        let after = self.batch[pos].0.clone();
        self.load(&after, true, self.batch_size)
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.position
            .and_then(|pos| self.batch.get(pos))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
