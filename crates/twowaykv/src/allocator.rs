//! Random value allocation.
//!
//! An [`Allocator`] proposes candidate values for a key and asks the caller whether
//! each one is taken. The index owns the notion of "taken" (committed reverse
//! entries plus values staged in the current batch); the allocator owns the
//! distribution and the attempt budget.

use rand::Rng;
use tracing::debug;

use crate::config::IndexConfig;
use crate::error::{Error, Result};

/// Chooses unique values for new keys.
pub trait Allocator: Send + Sync {
    /// Return a value for `key` for which `is_taken` answered `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollisionExhaustion`] when the attempt budget runs out, or
    /// any error raised by `is_taken`.
    fn allocate(&self, key: &str, is_taken: &mut dyn FnMut(u64) -> Result<bool>) -> Result<u64>;
}

/// Draws values uniformly from `[0, max_value)` with a bounded number of attempts.
#[derive(Debug, Clone, Copy)]
pub struct RandomAllocator {
    max_value: u64,
    max_attempts: u64,
}

impl RandomAllocator {
    /// Create an allocator over `[0, max_value)`.
    ///
    /// Both bounds are clamped to at least one.
    pub fn new(max_value: u64, max_attempts: u64) -> Self {
        Self { max_value: max_value.max(1), max_attempts: max_attempts.max(1) }
    }

    /// Create an allocator from the index configuration.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.max_value, config.allocation_attempts())
    }
}

impl Allocator for RandomAllocator {
    fn allocate(&self, key: &str, is_taken: &mut dyn FnMut(u64) -> Result<bool>) -> Result<u64> {
        let mut rng = rand::thread_rng();

        for attempt in 1..=self.max_attempts {
            let candidate = rng.gen_range(0..self.max_value);
            if !is_taken(candidate)? {
                return Ok(candidate);
            }
            debug!(key, candidate, attempt, "value collision, retrying");
        }

        Err(Error::CollisionExhaustion { key: key.to_string(), attempts: self.max_attempts })
    }
}
