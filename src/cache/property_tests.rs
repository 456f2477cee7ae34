//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check expiry, overwrite, tag invalidation and flush behaviour
//! against arbitrary inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::clock::ManualClock;

// == Test Configuration ==
const TEST_DEFAULT_TTL: u64 = 3600;
const START_MS: i64 = 1_700_000_000_000;

fn new_store() -> (CacheStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    (CacheStore::with_clock(TEST_DEFAULT_TTL, clock.clone()), clock)
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}"
}

/// Generates JSON payloads of a few shapes
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ("[a-z]{1,8}", any::<u32>()).prop_map(|(name, n)| json!({ "name": name, "n": n })),
    ]
}

fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("customer".to_string()),
        Just("job".to_string()),
        Just("session".to_string()),
        Just("ai".to_string()),
    ]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, tags: Vec<String> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), prop::collection::vec(tag_strategy(), 0..3))
            .prop_map(|(key, tags)| CacheOp::Set { key, tags }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Reading before the TTL elapses returns the value, reading after returns nothing.
    #[test]
    fn prop_ttl_expiry(
        key in valid_key_strategy(),
        value in value_strategy(),
        ttl in 1u64..100_000,
        before_ms in 0u64..1_000,
        after_ms in 0u64..1_000_000,
    ) {
        let (mut store, clock) = new_store();
        store.set(&key, value.clone(), Some(ttl), ["t"]).unwrap();

        // Strictly inside the window
        let inside = (ttl * 1000 - 1).min(before_ms * ttl);
        clock.advance(std::time::Duration::from_millis(inside));
        prop_assert_eq!(store.get(&key).unwrap(), value);

        // At or past the boundary
        clock.set(START_MS + (ttl * 1000 + after_ms) as i64);
        prop_assert!(store.get(&key).is_err(), "Entry should be absent after TTL");
        prop_assert!(!store.exists(&key));
    }

    // The last write wins, and only its tags count for invalidation.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy(),
    ) {
        let (mut store, _) = new_store();

        store.set(&key, value1, None, ["first"]).unwrap();
        store.set(&key, value2.clone(), None, ["second"]).unwrap();

        prop_assert_eq!(store.get(&key).unwrap(), value2);
        prop_assert_eq!(store.len(), 1, "Should have exactly one entry after overwrite");
        prop_assert_eq!(store.invalidate_by_tag("first"), 0);
        prop_assert!(store.exists(&key));
    }

    // Invalidating a tag removes exactly the live entries carrying it.
    #[test]
    fn prop_tag_invalidation_exact(
        ops in prop::collection::vec(cache_op_strategy(), 1..60),
        target in tag_strategy(),
    ) {
        let (mut store, _) = new_store();
        // Shadow model: key -> tags of the latest write
        let mut model: std::collections::HashMap<String, Vec<String>> = Default::default();

        for op in ops {
            match op {
                CacheOp::Set { key, tags } => {
                    store.set(&key, json!(key), None, tags.clone()).unwrap();
                    model.insert(key, tags);
                }
                CacheOp::Get { key } => {
                    let _ = store.get(&key);
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                    model.remove(&key);
                }
            }
        }

        let tagged: HashSet<String> = model
            .iter()
            .filter(|(_, tags)| tags.contains(&target))
            .map(|(key, _)| key.clone())
            .collect();

        let removed = store.invalidate_by_tag(&target);
        prop_assert_eq!(removed, tagged.len());

        for (key, _) in model.iter() {
            prop_assert_eq!(store.exists(key), !tagged.contains(key), "key {}", key);
        }
        let stats = store.stats();
        prop_assert_eq!(stats.keys_by_tag.get(&target), None);
    }

    // Hit/miss counters and key totals track the operations performed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let (mut store, _) = new_store();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, tags } => {
                    let _ = store.set(&key, json!(1), None, tags);
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Ok(_) => expected_hits += 1,
                    Err(_) => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }
        }

        let total = store.len();
        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_keys, total, "Total keys mismatch");
    }

    // Flushing leaves nothing behind, and a second flush changes nothing.
    #[test]
    fn prop_flush_idempotent(ops in prop::collection::vec(cache_op_strategy(), 0..40)) {
        let (mut store, _) = new_store();
        for op in ops {
            if let CacheOp::Set { key, tags } = op {
                store.set(&key, json!(null), None, tags).unwrap();
            }
        }

        store.flush_all();
        let once = store.stats();
        prop_assert_eq!(once.total_keys, 0);
        prop_assert!(once.keys_by_tag.is_empty());

        prop_assert_eq!(store.flush_all(), 0);
        let twice = store.stats();
        prop_assert_eq!(once, twice);
    }
}
