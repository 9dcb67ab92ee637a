//! Index configuration and builder.
//!
//! [`IndexConfig`] holds every tunable of a [`BidirectionalIndex`]. Most callers
//! use [`IndexBuilder`] instead of filling the struct by hand:
//!
//! ```ignore
//! use twowaykv::IndexBuilder;
//!
//! let index = IndexBuilder::new()
//!     .path("/var/lib/twowaykv")
//!     .cache_size(64 * 1024 * 1024)
//!     .open()?;
//! ```

use std::path::{Path, PathBuf};

use twowaykv_storage::backends::RedbEngine;

use crate::error::{Error, Result};
use crate::index::BidirectionalIndex;

/// Upper bound (exclusive) of the value space: the largest signed 64-bit integer.
pub const DEFAULT_MAX_VALUE: u64 = i64::MAX as u64;

/// Cap on allocation attempts per key when none is configured.
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u64 = 1024;

/// Seek attempts allowed per requested sample entry.
pub const DEFAULT_SAMPLE_RETRY_FACTOR: usize = 5;

/// Largest sample a single request may ask for.
pub const DEFAULT_MAX_SAMPLE_SIZE: usize = 25;

/// Subdirectory holding the key -> value engine.
pub const FORWARD_DIR: &str = "k2v";

/// Subdirectory holding the value -> key engine.
pub const REVERSE_DIR: &str = "v2k";

/// Database file name inside each engine directory.
pub const DATA_FILE: &str = "data.redb";

/// Where the two engines keep their data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Persistent storage under `<dir>/k2v` and `<dir>/v2k`.
    Directory(PathBuf),
    /// Volatile storage, lost when the index is dropped.
    InMemory,
}

/// Configuration of a [`BidirectionalIndex`].
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Storage location of both engines.
    pub location: Location,
    /// Allocated values fall in `[0, max_value)`.
    pub max_value: u64,
    /// Allocation attempts per key before giving up.
    ///
    /// `None` means `min(max_value, DEFAULT_MAX_ALLOCATION_ATTEMPTS)`.
    pub max_allocation_attempts: Option<u64>,
    /// A sample of `n` entries may use at most `n * sample_retry_factor` seeks.
    pub sample_retry_factor: usize,
    /// Largest accepted sample size.
    pub max_sample_size: usize,
    /// Page cache size in bytes for each engine. `None` uses the backend default.
    pub cache_size: Option<usize>,
}

impl IndexConfig {
    /// Create a configuration with default tunables for the given location.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            max_value: DEFAULT_MAX_VALUE,
            max_allocation_attempts: None,
            sample_retry_factor: DEFAULT_SAMPLE_RETRY_FACTOR,
            max_sample_size: DEFAULT_MAX_SAMPLE_SIZE,
            cache_size: None,
        }
    }

    /// Create a configuration for an in-memory index.
    pub fn in_memory() -> Self {
        Self::new(Location::InMemory)
    }

    /// The effective number of allocation attempts per key.
    #[must_use]
    pub fn allocation_attempts(&self) -> u64 {
        self.max_allocation_attempts
            .unwrap_or_else(|| self.max_value.min(DEFAULT_MAX_ALLOCATION_ATTEMPTS))
    }

    /// Path of the forward engine's database file, if persistent.
    pub fn forward_path(&self) -> Option<PathBuf> {
        self.engine_path(FORWARD_DIR)
    }

    /// Path of the reverse engine's database file, if persistent.
    pub fn reverse_path(&self) -> Option<PathBuf> {
        self.engine_path(REVERSE_DIR)
    }

    fn engine_path(&self, subdir: &str) -> Option<PathBuf> {
        match &self.location {
            Location::Directory(dir) => Some(dir.join(subdir).join(DATA_FILE)),
            Location::InMemory => None,
        }
    }

    /// Check the tunables for values that would make the index unusable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_value == 0 {
            return Err(Error::config("max_value must be greater than zero"));
        }
        if self.max_allocation_attempts == Some(0) {
            return Err(Error::config("max_allocation_attempts must be greater than zero"));
        }
        if self.sample_retry_factor == 0 {
            return Err(Error::config("sample_retry_factor must be greater than zero"));
        }
        if self.max_sample_size == 0 {
            return Err(Error::config("max_sample_size must be greater than zero"));
        }
        if let Location::Directory(dir) = &self.location {
            if dir.as_os_str().is_empty() {
                return Err(Error::config("storage directory must not be empty"));
            }
        }
        Ok(())
    }
}

/// Builder for opening a [`BidirectionalIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    location: Option<Location>,
    max_value: Option<u64>,
    max_allocation_attempts: Option<u64>,
    sample_retry_factor: Option<usize>,
    max_sample_size: Option<usize>,
    cache_size: Option<usize>,
}

impl IndexBuilder {
    /// Create a builder with no storage location set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for an in-memory index.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { location: Some(Location::InMemory), ..Self::default() }
    }

    /// Store data under `dir`, in `dir/k2v` and `dir/v2k`.
    #[must_use]
    pub fn path(mut self, dir: impl AsRef<Path>) -> Self {
        self.location = Some(Location::Directory(dir.as_ref().to_path_buf()));
        self
    }

    /// Set the exclusive upper bound of allocated values.
    #[must_use]
    pub const fn max_value(mut self, max_value: u64) -> Self {
        self.max_value = Some(max_value);
        self
    }

    /// Set the allocation attempts per key.
    #[must_use]
    pub const fn max_allocation_attempts(mut self, attempts: u64) -> Self {
        self.max_allocation_attempts = Some(attempts);
        self
    }

    /// Set the seek budget multiplier for sampling.
    #[must_use]
    pub const fn sample_retry_factor(mut self, factor: usize) -> Self {
        self.sample_retry_factor = Some(factor);
        self
    }

    /// Set the largest accepted sample size.
    #[must_use]
    pub const fn max_sample_size(mut self, size: usize) -> Self {
        self.max_sample_size = Some(size);
        self
    }

    /// Set the page cache size in bytes for each engine.
    #[must_use]
    pub const fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    /// Resolve the builder into a validated [`IndexConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no location was set or a tunable is invalid.
    pub fn build_config(self) -> Result<IndexConfig> {
        let location = self
            .location
            .ok_or_else(|| Error::config("a storage path or in-memory mode must be set"))?;

        let mut config = IndexConfig::new(location);
        if let Some(max_value) = self.max_value {
            config.max_value = max_value;
        }
        config.max_allocation_attempts = self.max_allocation_attempts;
        if let Some(factor) = self.sample_retry_factor {
            config.sample_retry_factor = factor;
        }
        if let Some(size) = self.max_sample_size {
            config.max_sample_size = size;
        }
        config.cache_size = self.cache_size;

        config.validate()?;
        Ok(config)
    }

    /// Open the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or either engine fails to open.
    pub fn open(self) -> Result<BidirectionalIndex<RedbEngine>> {
        BidirectionalIndex::open_with_config(self.build_config()?)
    }
}
