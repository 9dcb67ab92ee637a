//! Batch create-if-absent.
//!
//! A batch runs in three phases under the writer lock:
//!
//! 1. classify every distinct key against one forward read view
//! 2. allocate a value for each new key, skipping values already staged
//! 3. commit all reverse mappings, then all forward mappings
//!
//! Failures are collected per key. A failed reverse commit does not stop the
//! forward commit, and new entries are returned once their forward mapping is
//! durable. Such entries have no reverse mapping: `get_by_value` misses them
//! until the index is repaired, and `check_consistency` lists them under
//! `missing_reverse`. A failed forward commit after a successful reverse one
//! returns no new entries and leaves orphaned reverse mappings instead.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use twowaykv_storage::{StorageEngine, Transaction};

use crate::codec::{decode_value, encode_value};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::index::{tables, write_all, BidirectionalIndex};

/// Entries produced by a multi-key operation together with per-key failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Existing and newly created entries.
    pub entries: Vec<Entry>,
    /// Human-readable failures, one per affected key.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Returns `true` if no error was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, err: &Error) {
        self.errors.push(err.to_string());
    }
}

/// Creates entries for keys that do not have one yet.
pub trait BatchCreator {
    /// Return an entry for every distinct key in `keys`, creating the missing ones.
    ///
    /// Keys that already exist are returned unchanged; unless
    /// `mute_already_exists` is set, each also adds `Key <k> already exists in DB`
    /// to the errors. A failure for one key never prevents the others.
    fn create_if_absent(&self, keys: &[String], mute_already_exists: bool) -> BatchOutcome;
}

impl<E: StorageEngine> BatchCreator for BidirectionalIndex<E> {
    fn create_if_absent(&self, keys: &[String], mute_already_exists: bool) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        let mut seen = HashSet::with_capacity(keys.len());
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            if key.is_empty() {
                outcome.fail(&Error::validation("key must not be empty"));
            } else if seen.insert(key.as_str()) {
                unique.push(key.as_str());
            }
        }
        if unique.is_empty() {
            return outcome;
        }

        let _guard = match self.lock_writer() {
            Ok(guard) => guard,
            Err(e) => {
                outcome.fail(&e);
                return outcome;
            }
        };

        let new_keys = match self.classify(&unique, mute_already_exists, &mut outcome) {
            Ok(new_keys) => new_keys,
            Err(e) => {
                warn!(error = %e, "failed to classify batch");
                outcome.fail(&e);
                return outcome;
            }
        };

        let staged = match self.allocate_batch(&new_keys, &mut outcome) {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = %e, "failed to allocate batch");
                outcome.fail(&e);
                return outcome;
            }
        };

        if !staged.is_empty() {
            self.flush_batch(staged, &mut outcome);
        }

        info!(
            requested = keys.len(),
            distinct = unique.len(),
            absent = new_keys.len(),
            errors = outcome.errors.len(),
            "batch create finished"
        );
        outcome
    }
}

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Split `keys` into existing (recorded in `outcome`) and new ones.
    fn classify<'k>(
        &self,
        keys: &[&'k str],
        mute_already_exists: bool,
        outcome: &mut BatchOutcome,
    ) -> Result<Vec<&'k str>> {
        let view = self.forward().begin_read()?;
        let mut new_keys = Vec::new();

        for &key in keys {
            let existing = view
                .get(tables::FORWARD, key.as_bytes())
                .map_err(Error::from)
                .and_then(|raw| raw.map(|raw| decode_value(&raw)).transpose());

            match existing {
                Ok(Some(value)) => {
                    outcome.entries.push(Entry::new(key, value));
                    if !mute_already_exists {
                        outcome.fail(&Error::AlreadyExists { key: key.to_string() });
                    }
                }
                Ok(None) => new_keys.push(key),
                Err(e) => {
                    warn!(key, error = %e, "failed to read key");
                    outcome.fail(&e);
                }
            }
        }

        Ok(new_keys)
    }

    /// Pick a distinct free value for every new key.
    fn allocate_batch(&self, keys: &[&str], outcome: &mut BatchOutcome) -> Result<Vec<Entry>> {
        let view = self.reverse().begin_read()?;
        let mut staged_values = HashSet::with_capacity(keys.len());
        let mut staged = Vec::with_capacity(keys.len());

        for &key in keys {
            let allocated = {
                let mut is_taken = |candidate: u64| -> Result<bool> {
                    if staged_values.contains(&candidate) {
                        return Ok(true);
                    }
                    Ok(view.get(tables::REVERSE, &encode_value(candidate))?.is_some())
                };
                self.allocator().allocate(key, &mut is_taken)
            };

            match allocated {
                Ok(value) => {
                    debug!(key, value, "allocated value");
                    staged_values.insert(value);
                    staged.push(Entry::new(key, value));
                }
                Err(e) => {
                    warn!(key, error = %e, "allocation failed");
                    outcome.fail(&e);
                }
            }
        }

        Ok(staged)
    }

    /// Commit the reverse batch, then the forward batch.
    fn flush_batch(&self, staged: Vec<Entry>, outcome: &mut BatchOutcome) {
        let reverse: Vec<_> = staged
            .iter()
            .map(|entry| (encode_value(entry.value), entry.key.as_bytes().to_vec()))
            .collect();
        if let Err(e) = write_all(self.reverse(), tables::REVERSE, &reverse) {
            warn!(entries = staged.len(), error = %e, "reverse batch flush failed");
            outcome.errors.push(format!("failed to flush reverse index: {e}"));
        }

        let forward: Vec<_> = staged
            .iter()
            .map(|entry| (entry.key.as_bytes().to_vec(), encode_value(entry.value)))
            .collect();
        match write_all(self.forward(), tables::FORWARD, &forward) {
            Ok(()) => outcome.entries.extend(staged),
            Err(e) => {
                warn!(entries = staged.len(), error = %e, "forward batch flush failed");
                outcome.errors.push(format!("failed to flush forward index: {e}"));
            }
        }
    }
}
