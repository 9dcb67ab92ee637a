//! Redb storage backend.
//!
//! Redb is a pure-Rust embedded database. Each [`RedbEngine`] owns one database
//! file; the index opens two of them, one per direction.
//!
//! ```ignore
//! use twowaykv_storage::backends::RedbEngine;
//! use twowaykv_storage::{StorageEngine, Transaction};
//!
//! let engine = RedbEngine::open("v2k/data.redb")?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.put("v2k", b"4821", b"https://example.com")?;
//! tx.commit()?;
//! ```
//!
//! For tests, [`RedbEngine::in_memory`] creates a database that is lost on drop.

mod engine;
pub mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbCursor, RedbTransaction};
