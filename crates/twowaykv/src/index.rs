//! The bidirectional index.
//!
//! A [`BidirectionalIndex`] owns two storage engines. The forward engine maps
//! keys to values, the reverse engine maps values back to keys. Every creation
//! writes the reverse mapping first, then the forward one; each write is atomic
//! within its engine, but the pair is not atomic across engines. A crash or a
//! failed forward commit leaves a reverse entry without its forward twin. A
//! batch whose reverse commit fails still commits its forward mappings, leaving
//! keys whose values are unknown to the reverse engine. Both cases are reported
//! by [`check_consistency`](BidirectionalIndex::check_consistency).
//!
//! # Examples
//!
//! ```ignore
//! use twowaykv::BidirectionalIndex;
//!
//! let index = BidirectionalIndex::open("/var/lib/twowaykv")?;
//! let entry = index.write_entry("https://example.com")?;
//! assert_eq!(index.get_by_value(entry.value)?, Some(entry));
//! ```

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};
use twowaykv_storage::backends::{RedbConfig, RedbEngine};
use twowaykv_storage::{StorageEngine, Transaction};

use crate::allocator::{Allocator, RandomAllocator};
use crate::codec::{decode_key, decode_value, encode_value};
use crate::config::{IndexBuilder, IndexConfig, Location, DATA_FILE, FORWARD_DIR, REVERSE_DIR};
use crate::entry::Entry;
use crate::error::{Error, Result};

/// Logical table names inside each engine.
pub(crate) mod tables {
    /// Key -> value, in the forward engine.
    pub const FORWARD: &str = "k2v";
    /// Value -> key, in the reverse engine.
    pub const REVERSE: &str = "v2k";
}

/// A key <-> random value index over two storage engines.
///
/// # Thread Safety
///
/// `BidirectionalIndex` is `Send + Sync`. Writes ([`write_entry`](Self::write_entry)
/// and batch creation) are serialized by an internal writer lock; reads run
/// concurrently on engine snapshots and never wait for it.
pub struct BidirectionalIndex<E: StorageEngine = RedbEngine> {
    forward: E,
    reverse: E,
    config: IndexConfig,
    allocator: Box<dyn Allocator>,
    write_lock: Mutex<()>,
}

impl BidirectionalIndex<RedbEngine> {
    /// Open or create an index under `dir` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either engine cannot be opened.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        IndexBuilder::new().path(dir).open()
    }

    /// Create an in-memory index.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory engines cannot be created.
    pub fn in_memory() -> Result<Self> {
        IndexBuilder::in_memory().open()
    }

    /// Open an index with the given configuration.
    ///
    /// This is typically called through [`IndexBuilder::open()`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or either engine cannot be
    /// opened.
    pub fn open_with_config(config: IndexConfig) -> Result<Self> {
        config.validate()?;

        let (forward, reverse) = match &config.location {
            Location::InMemory => (RedbEngine::in_memory()?, RedbEngine::in_memory()?),
            Location::Directory(dir) => {
                let mut redb_config = RedbConfig::new();
                if let Some(cache_size) = config.cache_size {
                    redb_config = redb_config.cache_size(cache_size);
                }
                (
                    open_engine(&dir.join(FORWARD_DIR), redb_config)?,
                    open_engine(&dir.join(REVERSE_DIR), redb_config)?,
                )
            }
        };

        info!(location = ?config.location, max_value = config.max_value, "opened index");
        Self::from_engines(forward, reverse, config)
    }
}

fn open_engine(dir: &Path, config: RedbConfig) -> Result<RedbEngine> {
    fs::create_dir_all(dir)?;
    Ok(RedbEngine::open_with_config(dir.join(DATA_FILE), config)?)
}

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Build an index over two already-open engines.
    ///
    /// The `location` of `config` is informational only here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn from_engines(forward: E, reverse: E, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let allocator = Box::new(RandomAllocator::from_config(&config));
        Ok(Self { forward, reverse, config, allocator, write_lock: Mutex::new(()) })
    }

    /// Replace the value allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: impl Allocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    /// Get the configuration used to open this index.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Create an entry for a single key.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `key` is empty
    /// - [`Error::AlreadyExists`] if `key` already has a value
    /// - [`Error::CollisionExhaustion`] if no free value was found
    /// - [`Error::Storage`] if either engine fails
    pub fn write_entry(&self, key: &str) -> Result<Entry> {
        if key.is_empty() {
            return Err(Error::validation("key must not be empty"));
        }

        let _guard = self.lock_writer()?;

        if self.forward.begin_read()?.get(tables::FORWARD, key.as_bytes())?.is_some() {
            return Err(Error::AlreadyExists { key: key.to_string() });
        }

        let value = {
            let view = self.reverse.begin_read()?;
            self.allocator.allocate(key, &mut |candidate| {
                Ok(view.get(tables::REVERSE, &encode_value(candidate))?.is_some())
            })?
        };

        let encoded = encode_value(value);
        write_all(&self.reverse, tables::REVERSE, &[(encoded.clone(), key.as_bytes().to_vec())])?;
        write_all(&self.forward, tables::FORWARD, &[(key.as_bytes().to_vec(), encoded)])?;

        debug!(key, value, "created entry");
        Ok(Entry::new(key, value))
    }

    /// Look up the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward engine fails or the stored value is corrupt.
    pub fn get_by_key(&self, key: &str) -> Result<Option<Entry>> {
        let view = self.forward.begin_read()?;
        view.get(tables::FORWARD, key.as_bytes())?
            .map(|raw| decode_value(&raw).map(|value| Entry::new(key, value)))
            .transpose()
    }

    /// Look up the entry holding `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reverse engine fails or the stored key is corrupt.
    pub fn get_by_value(&self, value: u64) -> Result<Option<Entry>> {
        let view = self.reverse.begin_read()?;
        view.get(tables::REVERSE, &encode_value(value))?
            .map(|raw| decode_key(raw).map(|key| Entry::new(key, value)))
            .transpose()
    }

    /// Look up several values in one read view.
    ///
    /// Each missing value adds `Value <v> not found in DB` to the error list and
    /// lookup continues with the next one.
    pub fn get_by_values(&self, values: &[u64]) -> (Vec<Entry>, Vec<String>) {
        let mut entries = Vec::with_capacity(values.len());
        let mut errors = Vec::new();

        let view = match self.reverse.begin_read() {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "failed to open reverse read view");
                errors.push(Error::from(e).to_string());
                return (entries, errors);
            }
        };

        for &value in values {
            let found = view
                .get(tables::REVERSE, &encode_value(value))
                .map_err(Error::from)
                .and_then(|raw| raw.map(decode_key).transpose());

            match found {
                Ok(Some(key)) => entries.push(Entry::new(key, value)),
                Ok(None) => errors.push(format!("Value {value} not found in DB")),
                Err(e) => {
                    warn!(value, error = %e, "value lookup failed");
                    errors.push(e.to_string());
                }
            }
        }

        (entries, errors)
    }

    /// Flush both engines to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if either engine fails to flush.
    pub fn flush(&self) -> Result<()> {
        self.reverse.flush()?;
        self.forward.flush()?;
        Ok(())
    }

    pub(crate) fn forward(&self) -> &E {
        &self.forward
    }

    pub(crate) fn reverse(&self) -> &E {
        &self.reverse
    }

    pub(crate) fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }

    pub(crate) fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|e| Error::LockPoisoned(e.to_string()))
    }
}

/// Write `pairs` into `table` as one atomic batch.
pub(crate) fn write_all<E: StorageEngine>(
    engine: &E,
    table: &str,
    pairs: &[(Vec<u8>, Vec<u8>)],
) -> Result<()> {
    let mut tx = engine.begin_write()?;
    for (key, value) in pairs {
        tx.put(table, key, value)?;
    }
    tx.commit()?;
    Ok(())
}
