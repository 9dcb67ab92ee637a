//! Random sampling of stored entries.
//!
//! Each try draws a random value, seeks the reverse table to the first stored
//! value at or after its decimal encoding and keeps the hit if it is new. Since
//! values are ordered as strings (see [`codec`](crate::codec)), the chance of
//! landing on an entry depends on the width of the string gap before it, not on
//! the numeric gap. Sampling is therefore not uniform over stored entries.

use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, warn};
use twowaykv_storage::{Cursor, StorageEngine, Transaction};

use crate::codec::{decode_key, decode_value, encode_value};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::index::{tables, BidirectionalIndex};

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Return `n` distinct entries picked at random.
    ///
    /// At most `n * sample_retry_factor` seeks are made.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `n` is zero or above `max_sample_size`
    /// - [`Error::MaxCollisions`] if the seek budget ran out first
    /// - [`Error::Storage`] or [`Error::Corrupt`] on engine failures
    pub fn sample(&self, n: usize) -> Result<Vec<Entry>> {
        let max = self.config().max_sample_size;
        if n == 0 || n > max {
            return Err(Error::validation(format!("n must be between 1 and {max}, got {n}")));
        }

        let max_tries = n.saturating_mul(self.config().sample_retry_factor);
        let max_value = self.config().max_value;

        let view = self.reverse().begin_read()?;
        let mut cursor = view.cursor(tables::REVERSE)?;
        let mut rng = rand::thread_rng();

        let mut seen = HashSet::with_capacity(n);
        let mut entries = Vec::with_capacity(n);
        let mut tries = 0;

        while entries.len() < n {
            if tries >= max_tries {
                warn!(requested = n, found = entries.len(), tries, "sampling gave up");
                return Err(Error::MaxCollisions { requested: n, found: entries.len(), tries });
            }
            tries += 1;

            let target = rng.gen_range(0..max_value);
            let Some((raw_value, raw_key)) = cursor.seek(&encode_value(target))? else {
                continue;
            };

            let value = decode_value(&raw_value)?;
            if value == 0 || !seen.insert(value) {
                continue;
            }
            entries.push(Entry::new(decode_key(raw_key)?, value));
        }

        debug!(requested = n, tries, "sampled entries");
        Ok(entries)
    }
}
