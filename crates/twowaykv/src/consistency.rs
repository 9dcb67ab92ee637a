//! Cross-engine consistency check.
//!
//! The two engines are committed one after the other, so a crash or a failed
//! forward commit can leave them disagreeing. [`BidirectionalIndex::check_consistency`]
//! scans both and lists every mapping that has no matching twin.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use twowaykv_storage::{Cursor, StorageEngine, Transaction};

use crate::codec::{decode_key, decode_value, encode_value};
use crate::entry::Entry;
use crate::error::Result;
use crate::index::{tables, BidirectionalIndex};

/// Result of [`BidirectionalIndex::check_consistency`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Entries in the forward engine.
    pub forward_entries: u64,
    /// Entries in the reverse engine.
    pub reverse_entries: u64,
    /// Forward entries whose value is missing from, or maps to another key in, the
    /// reverse engine.
    pub missing_reverse: Vec<Entry>,
    /// Reverse entries whose key does not map back to their value.
    pub orphaned_reverse: Vec<Entry>,
}

impl ConsistencyReport {
    /// Returns `true` if every mapping has its twin.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.missing_reverse.is_empty() && self.orphaned_reverse.is_empty()
    }
}

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Compare the forward and reverse engines entry by entry.
    ///
    /// Both scans run on read views opened together; concurrent writers may still
    /// commit between the two `begin_read` calls, so run this on a quiet index for
    /// an exact answer.
    ///
    /// # Errors
    ///
    /// Returns an error if either engine fails or a stored entry is corrupt.
    pub fn check_consistency(&self) -> Result<ConsistencyReport> {
        let forward = self.forward().begin_read()?;
        let reverse = self.reverse().begin_read()?;
        let mut report = ConsistencyReport::default();

        let mut cursor = forward.cursor(tables::FORWARD)?;
        while let Some((raw_key, raw_value)) = cursor.next()? {
            report.forward_entries += 1;
            match reverse.get(tables::REVERSE, &raw_value)? {
                Some(back) if back == raw_key => {}
                _ => {
                    let value = decode_value(&raw_value)?;
                    report.missing_reverse.push(Entry::new(decode_key(raw_key)?, value));
                }
            }
        }

        let mut cursor = reverse.cursor(tables::REVERSE)?;
        while let Some((raw_value, raw_key)) = cursor.next()? {
            report.reverse_entries += 1;
            let value = decode_value(&raw_value)?;
            match forward.get(tables::FORWARD, &raw_key)? {
                Some(forth) if forth == encode_value(value) => {}
                _ => report.orphaned_reverse.push(Entry::new(decode_key(raw_key)?, value)),
            }
        }

        if report.is_consistent() {
            info!(entries = report.forward_entries, "index is consistent");
        } else {
            warn!(
                missing_reverse = report.missing_reverse.len(),
                orphaned_reverse = report.orphaned_reverse.len(),
                "index is inconsistent"
            );
        }
        Ok(report)
    }
}
