//! Integration tests for the settings store and the submission log
//!
//! These tests verify:
//! - Default backfilling over arbitrary partial settings trees
//! - Path lookups that never panic, whatever the path
//! - The submission log bound and FIFO eviction under arbitrary capacities
//! - Disabled logging performing no writes

use camino::Utf8PathBuf;
use formgate::{ConfigStore, SubmissionLog};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

const REQUIRED_KEYS: [&str; 7] = [
    "default_params",
    "separator",
    "logs_count",
    "use_honeypot",
    "min_sec_after_load",
    "max_posts_by_hour",
    "min_sec_between_posts",
];

fn store_from(tree: &Value) -> (ConfigStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().join("config.json")).unwrap();
    fs::write(&path, serde_json::to_string(tree).unwrap()).unwrap();
    (ConfigStore::load(&path), temp_dir)
}

#[test]
fn test_full_tree_round_trip_preserves_unknown_keys() {
    let (store, _temp_dir) = store_from(&json!({"custom": {"nested": [1, 2, 3]}}));

    // Read-modify-write the complete tree, as callers must.
    let mut tree = store.tree().clone();
    tree["separator"] = json!("|");
    store.save(&tree).unwrap();

    let mut store = store;
    store.reload();
    assert_eq!(store.get_str(&["separator"]), Some("|"));
    assert_eq!(store.get_i64(&["custom", "nested", "1"]), Some(2));
}

proptest! {
    /// Whatever subset of required keys a tree starts with, after load all
    /// seven resolve, and pre-existing non-empty values are untouched.
    #[test]
    fn prop_backfill_completes_required_keys(
        present in prop::collection::btree_map(0usize..7, 1u32..10_000, 0..7)
    ) {
        let mut tree = serde_json::Map::new();
        for (&index, &value) in &present {
            tree.insert(REQUIRED_KEYS[index].to_string(), json!(value));
        }
        let (store, _temp_dir) = store_from(&Value::Object(tree));

        for (index, key) in REQUIRED_KEYS.iter().copied().enumerate() {
            let resolved = store.get(&[key]);
            prop_assert!(resolved.is_some(), "{key} missing after load");
            if let Some(&value) = present.get(&index) {
                prop_assert_eq!(store.get_i64(&[key]), Some(i64::from(value)));
            }
        }
    }

    /// Lookups on arbitrary paths return instead of panicking.
    #[test]
    fn prop_get_never_panics(path in prop::collection::vec("[a-z0-9]{0,4}", 0..5)) {
        let (store, _temp_dir) = store_from(&json!({
            "a": {"b": [1, {"c": "d"}]},
            "0": "zero-keyed",
        }));
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        let _ = store.get(&segments);
    }

    /// The log never holds more than max(0, capacity) entries, and eviction
    /// drops the oldest entries first.
    #[test]
    fn prop_log_stays_bounded(capacity in -2i64..6, count in 0usize..12) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("log.json")).unwrap();
        let log = SubmissionLog::new(&path, capacity);

        for i in 0..count {
            log.append(vec![format!("entry-{i}")]).unwrap();
        }

        let entries = log.entries();
        let bound = capacity.max(0) as usize;
        prop_assert!(entries.len() <= bound);

        if capacity <= 0 {
            prop_assert!(!path.exists(), "disabled log must never write");
        } else if count >= bound && bound > 0 {
            // Survivors are exactly the newest `bound` entries.
            prop_assert_eq!(entries.len(), bound);
            prop_assert_eq!(entries[0][0].as_str(), format!("entry-{}", count - bound));
            prop_assert_eq!(entries[bound - 1][0].as_str(), format!("entry-{}", count - 1));
        } else {
            prop_assert_eq!(entries.len(), count);
        }
    }
}
