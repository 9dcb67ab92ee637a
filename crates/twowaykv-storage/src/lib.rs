//! `twowaykv` storage
//!
//! This crate provides the storage engine abstraction and the redb backend used by
//! the two-way index. The index keeps two independent engine instances, one per
//! direction, and only talks to them through the traits defined here.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - Opens read views and write batches
//! - [`Transaction`] - Point reads, staged writes, atomic commit
//! - [`Cursor`] - Ordered iteration with seek
//!
//! # Example
//!
//! ```ignore
//! use twowaykv_storage::{StorageEngine, Transaction};
//! use twowaykv_storage::backends::RedbEngine;
//!
//! let engine = RedbEngine::open("k2v/data.redb")?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.put("k2v", b"https://example.com", b"4821")?;
//! tx.commit()?;
//!
//! let tx = engine.begin_read()?;
//! assert_eq!(tx.get("k2v", b"https://example.com")?, Some(b"4821".to_vec()));
//! ```

pub mod backends;
pub mod engine;

pub use engine::{Cursor, CursorResult, KeyValue, StorageEngine, StorageError, Transaction};
