//! Storage engine traits and abstractions.
//!
//! This module defines the traits that storage backends must implement:
//!
//! - [`StorageEngine`] - Entry point for opening transactions
//! - [`Transaction`] - Read view or write batch with get/put/cursor
//! - [`Cursor`] - Ordered iteration over key-value pairs
//!
//! All operations return `Result<_, StorageError>`.

mod error;
mod traits;

pub use error::StorageError;
pub use traits::{Cursor, CursorResult, KeyValue, StorageEngine, Transaction};
