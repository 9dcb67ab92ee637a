//! `twowaykv` - A Bidirectional Key/Identifier Index
//!
//! `twowaykv` assigns every key a unique, randomly drawn integer and keeps both
//! directions of the mapping queryable. It is built for turning arbitrary strings
//! (URLs, names) into compact numeric identifiers and back.
//!
//! # Features
//!
//! - **Create-if-absent batches**: resolve many keys at once, creating the missing ones
//! - **Reverse lookup**: find the key behind any identifier
//! - **Random sampling**: pick distinct stored entries at random
//! - **Prefix search**: list keys sharing a leading byte sequence
//! - **Export and consistency check**: portable JSON-lines dump and a cross-engine audit
//!
//! # Quick Start
//!
//! ```ignore
//! use twowaykv::{BatchCreator, BidirectionalIndex};
//!
//! let index = BidirectionalIndex::open("/var/lib/twowaykv")?;
//!
//! let outcome = index.create_if_absent(&["test1".into(), "test2".into()], true);
//! for entry in &outcome.entries {
//!     println!("{} -> {}", entry.key, entry.value);
//! }
//!
//! let sample = index.sample(5)?;
//! let matches = index.search_by_prefix("test")?;
//! ```
//!
//! # Storage Layout
//!
//! Two redb engines live under the data directory: `k2v/` maps keys to values and
//! `v2k/` maps values to keys. Values are stored as decimal strings.

pub mod allocator;
pub mod batch;
pub mod codec;
pub mod config;
pub mod consistency;
pub mod entry;
pub mod error;
pub mod export;
pub mod index;
mod sample;
mod search;

pub use allocator::{Allocator, RandomAllocator};
pub use batch::{BatchCreator, BatchOutcome};
pub use config::{IndexBuilder, IndexConfig, Location};
pub use consistency::ConsistencyReport;
pub use entry::Entry;
pub use error::{Error, Result};
pub use export::{ExportRecord, ExportStatistics, ExportWriter};
pub use index::BidirectionalIndex;

pub use twowaykv_storage::backends::RedbEngine;
pub use twowaykv_storage::StorageError;
