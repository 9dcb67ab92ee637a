//! Integration tests for the bidirectional index.

use std::collections::HashSet;

use proptest::prelude::*;
use twowaykv::{
    Allocator, BatchCreator, BidirectionalIndex, Entry, Error, IndexBuilder, Location, Result,
};

/// Create an in-memory index for testing.
fn create_test_index() -> BidirectionalIndex {
    BidirectionalIndex::in_memory().expect("failed to create in-memory index")
}

fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

/// Hands out values from a fixed list, skipping taken ones.
struct ScriptedAllocator(Vec<u64>);

impl Allocator for ScriptedAllocator {
    fn allocate(&self, key: &str, is_taken: &mut dyn FnMut(u64) -> Result<bool>) -> Result<u64> {
        for &candidate in &self.0 {
            if !is_taken(candidate)? {
                return Ok(candidate);
            }
        }
        Err(Error::CollisionExhaustion { key: key.to_string(), attempts: self.0.len() as u64 })
    }
}

fn assert_bidirectional(index: &BidirectionalIndex, entries: &[Entry]) {
    for entry in entries {
        assert_eq!(index.get_by_key(&entry.key).expect("get_by_key"), Some(entry.clone()));
        assert_eq!(index.get_by_value(entry.value).expect("get_by_value"), Some(entry.clone()));
    }
}

// ============================================================================
// Batch Creation Scenarios
// ============================================================================

#[test]
fn test_create_two_keys_on_empty_store() {
    let index = create_test_index();

    let outcome = index.create_if_absent(&keys(&["test1", "test2"]), true);
    assert_eq!(outcome.entries.len(), 2);
    assert!(outcome.errors.is_empty());
    assert_bidirectional(&index, &outcome.entries);
}

#[test]
fn test_existing_key_reported_when_not_muted() {
    let index = create_test_index();
    let existing = index.write_entry("alreadyExists").expect("failed to write");

    let outcome = index.create_if_absent(&keys(&["alreadyExists"]), false);
    assert_eq!(outcome.entries, vec![existing]);
    assert_eq!(outcome.errors, vec!["Key alreadyExists already exists in DB"]);
}

#[test]
fn test_mixed_batch_with_muted_existing_key() {
    let index = create_test_index();
    let existing = index.write_entry("alreadyExists2").expect("failed to write");

    let outcome =
        index.create_if_absent(&keys(&["key", "key1", "key2", "alreadyExists2"]), true);
    assert_eq!(outcome.entries.len(), 4);
    assert!(outcome.errors.is_empty());
    assert!(outcome.entries.contains(&existing));
    assert_bidirectional(&index, &outcome.entries);
}

#[test]
fn test_duplicate_keys_in_one_batch() {
    let index = create_test_index();

    let outcome = index.create_if_absent(&keys(&["k", "k1", "k"]), true);
    assert_eq!(outcome.entries.len(), 2);
    let found: HashSet<&str> = outcome.entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(found, HashSet::from(["k", "k1"]));
}

#[test]
fn test_create_is_idempotent_when_muted() {
    let index = create_test_index();

    let first = index.create_if_absent(&keys(&["k"]), true);
    let second = index.create_if_absent(&keys(&["k"]), true);
    assert_eq!(first.entries, second.entries);
    assert!(first.errors.is_empty());
    assert!(second.errors.is_empty());
}

#[test]
fn test_second_create_reports_existing_when_not_muted() {
    let index = create_test_index();

    let first = index.create_if_absent(&keys(&["k"]), false);
    let second = index.create_if_absent(&keys(&["k"]), false);
    assert_eq!(first.entries, second.entries);
    assert!(first.errors.is_empty());
    assert_eq!(second.errors, vec!["Key k already exists in DB"]);
}

#[test]
fn test_collision_with_committed_value_is_redrawn() {
    let index = create_test_index().with_allocator(ScriptedAllocator(vec![42, 43, 44]));

    let first = index.create_if_absent(&keys(&["a"]), true);
    assert_eq!(first.entries, vec![Entry::new("a", 42)]);

    let second = index.create_if_absent(&keys(&["b", "c"]), true);
    let mut values: Vec<u64> = second.entries.iter().map(|e| e.value).collect();
    values.sort_unstable();
    assert_eq!(values, vec![43, 44]);
    assert_bidirectional(&index, &second.entries);
}

// ============================================================================
// Lookup, Sampling, Search
// ============================================================================

#[test]
fn test_sample_returns_distinct_stored_entries() {
    let index = create_test_index();
    let all: Vec<String> = (0..1000).map(|i| format!("https://example.com/{i}")).collect();
    let outcome = index.create_if_absent(&all, true);
    assert!(outcome.errors.is_empty());

    for n in [1, 10, 25] {
        let sample = index.sample(n).expect("failed to sample");
        assert_eq!(sample.len(), n);

        let distinct: HashSet<u64> = sample.iter().map(|e| e.value).collect();
        assert_eq!(distinct.len(), n);
        assert_bidirectional(&index, &sample);
    }
}

#[test]
fn test_sample_larger_than_store_fails() {
    let index = create_test_index();
    index.create_if_absent(&keys(&["one", "two"]), true);

    let err = index.sample(5).expect_err("not enough entries");
    assert!(matches!(err, Error::MaxCollisions { requested: 5, tries: 25, .. }));
}

#[test]
fn test_sample_bounds_are_enforced() {
    let index = create_test_index();
    assert!(index.sample(0).expect_err("zero").is_validation());
    assert!(index.sample(26).expect_err("too large").is_validation());
}

#[test]
fn test_prefix_search_is_exact() {
    let index = create_test_index();
    let mut all: Vec<String> = (0..10).map(|i| format!("TEST-KEY-{i}")).collect();
    all.extend(keys(&["OTHER", "TE", "TEXT", "test-key-lower", "UNRELATED"]));
    assert!(index.create_if_absent(&all, true).errors.is_empty());

    let found = index.search_by_prefix("TES").expect("failed to search");
    let found_keys: Vec<&str> = found.iter().map(|e| e.key.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("TEST-KEY-{i}")).collect();
    assert_eq!(found_keys, expected);
    assert_bidirectional(&index, &found);
}

#[test]
fn test_get_by_values_mixed() {
    let index = create_test_index();
    let entry = index.write_entry("present").expect("failed to write");

    let (entries, errors) = index.get_by_values(&[entry.value]);
    assert_eq!(entries, vec![entry]);
    assert!(errors.is_empty());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_reopen_keeps_entries() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");

    let created = {
        let index = BidirectionalIndex::open(dir.path()).expect("failed to open");
        let outcome = index.create_if_absent(&keys(&["persist-a", "persist-b"]), true);
        index.flush().expect("failed to flush");
        outcome.entries
    };

    assert!(dir.path().join("k2v").join("data.redb").exists());
    assert!(dir.path().join("v2k").join("data.redb").exists());

    let index = BidirectionalIndex::open(dir.path()).expect("failed to reopen");
    assert_bidirectional(&index, &created);
    assert!(index.check_consistency().expect("check").is_consistent());
}

#[test]
fn test_builder_opens_directory_location() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let index = IndexBuilder::new()
        .path(dir.path().join("nested"))
        .cache_size(1 << 20)
        .open()
        .expect("failed to open");

    assert_eq!(index.config().location, Location::Directory(dir.path().join("nested")));
    index.write_entry("k").expect("failed to write");
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_batches_keep_values_unique(
        batches in prop::collection::vec(
            prop::collection::vec("[a-z]{1,4}", 1..20),
            1..5,
        )
    ) {
        let index = IndexBuilder::in_memory().max_value(10_000).open().unwrap();
        let mut all_keys = HashSet::new();

        for batch in &batches {
            let outcome = index.create_if_absent(batch, true);
            prop_assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

            let distinct: HashSet<&String> = batch.iter().collect();
            prop_assert_eq!(outcome.entries.len(), distinct.len());
            all_keys.extend(batch.iter().cloned());
        }

        let mut values = HashSet::new();
        for key in &all_keys {
            let entry = index.get_by_key(key).unwrap().unwrap();
            prop_assert!(values.insert(entry.value), "value {} assigned twice", entry.value);
            prop_assert_eq!(index.get_by_value(entry.value).unwrap(), Some(entry));
        }

        let report = index.check_consistency().unwrap();
        prop_assert!(report.is_consistent());
        prop_assert_eq!(report.forward_entries, all_keys.len() as u64);
    }
}
