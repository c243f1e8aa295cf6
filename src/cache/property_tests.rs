//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check capacity, recency, statistics and invalidation
//! behavior over generated operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheOptions, CacheStore, KeyPattern};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

fn new_store(max_size: usize) -> CacheStore<String> {
    CacheStore::new(CacheOptions::with_max_size(max_size)).unwrap()
}

// == Strategies ==
/// Generates cache keys with an optional `prefix:` segment
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "(user|post|plugins)?:?[a-z0-9_]{1,12}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

/// Unique keys, in generation order
fn unique_keys_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(valid_key_strategy(), min..max).prop_map(|keys| {
        let mut seen = HashSet::new();
        keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Has { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics accuracy: hits and misses track get() outcomes exactly;
    // has() never moves them.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Has { key } => {
                    store.has(&key);
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, store.len(), "Size mismatch");
    }

    // Capacity enforcement: size never exceeds max_size after any set().
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200),
        max_size in 1usize..40
    ) {
        let mut store = new_store(max_size);

        for (key, value) in entries {
            store.set(key, value, None);
            prop_assert!(
                store.len() <= max_size,
                "Cache size {} exceeds max {}",
                store.len(),
                max_size
            );
        }
    }

    // Eviction always removes the least recently used key, compared against
    // a naive recency list model.
    #[test]
    fn prop_eviction_matches_recency_model(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        max_size in 1usize..8
    ) {
        let mut store = new_store(max_size);
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    if let Some(pos) = model.iter().position(|k| *k == key) {
                        model.remove(pos);
                    } else if model.len() >= max_size {
                        model.remove(0);
                    }
                    model.push(key.clone());
                    store.set(key, value, None);
                }
                CacheOp::Get { key } => {
                    let found = store.get(&key).is_some();
                    let pos = model.iter().position(|k| *k == key);
                    prop_assert_eq!(found, pos.is_some());
                    if let Some(pos) = pos {
                        let k = model.remove(pos);
                        model.push(k);
                    }
                }
                CacheOp::Has { key } => {
                    prop_assert_eq!(store.has(&key), model.contains(&key));
                }
                CacheOp::Delete { key } => {
                    let existed = store.delete(&key);
                    let pos = model.iter().position(|k| *k == key);
                    prop_assert_eq!(existed, pos.is_some());
                    if let Some(pos) = pos {
                        model.remove(pos);
                    }
                }
            }
            prop_assert_eq!(store.keys(), model.clone());
        }
    }

    // Overwrite semantics: the last value written wins and size stays 1.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let mut store = new_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), value1, None);
        store.set(key.clone(), value2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1);
    }

    // Pattern invalidation removes exactly the matching keys.
    #[test]
    fn prop_invalidate_removes_exactly_matches(
        keys in unique_keys_strategy(1, 40),
        prefix in "(user|post|plugins)"
    ) {
        let mut store = new_store(TEST_MAX_ENTRIES);
        for key in &keys {
            store.set(key.clone(), "v".to_string(), None);
        }

        let pattern = format!("{}:*", prefix);
        let matcher = KeyPattern::new(&pattern);
        let expected_removed = keys.iter().filter(|k| matcher.matches(k)).count();

        let removed = store.invalidate(&pattern);

        prop_assert_eq!(removed, expected_removed);
        for key in &keys {
            let should_remain = !key.starts_with(&format!("{}:", prefix));
            prop_assert_eq!(store.has(key), should_remain, "key {}", key);
        }
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry is returned before its TTL elapses and absent after it.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let mut store = new_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), value.clone(), Some(Duration::from_millis(50)));
        prop_assert_eq!(store.get(&key), Some(value));

        sleep(Duration::from_millis(120));

        prop_assert_eq!(store.get(&key), None);
        prop_assert_eq!(store.stats().expirations, 1);
    }
}
