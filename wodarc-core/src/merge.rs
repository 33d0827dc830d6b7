//! Folding normalized entries into the date-keyed record store.
//!
//! The store is a plain `BTreeMap`, so ascending key order is structural and
//! the on-disk descending presentation is just reverse iteration. Collisions
//! are resolved by suffixing, never by overwriting, which keeps the total
//! entry count an invariant of every merge.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::normalize::process_entry;

/// Date-keyed content mapping: `YYYY-MM-DD` (optionally `-N` suffixed) to
/// cleaned caption text.
pub type RecordStore = BTreeMap<String, String>;

/// First unused key for `base`: the base itself, else `base-2`, `base-3`, ...
///
/// Purely a function of the keys already present, so resolution is stable for
/// a fixed processing order regardless of how entries hash.
fn resolve_key(store: &RecordStore, base: &str) -> String {
    if !store.contains_key(base) {
        return base.to_string();
    }
    let mut idx = 2u32;
    loop {
        let candidate = format!("{base}-{idx}");
        if !store.contains_key(&candidate) {
            return candidate;
        }
        idx += 1;
    }
}

/// Normalize one raw entry and insert it into `store`.
///
/// The effective key is the content-derived date when present, else
/// `original_key`. Returns the key the entry was stored under. An entry whose
/// stripped content is empty is still inserted; an all-heading caption is a
/// valid (empty) record.
pub fn fold_entry(store: &mut RecordStore, original_key: &str, raw_text: &str) -> String {
    let (content_date, stripped) = process_entry(raw_text);
    let base = content_date.as_deref().unwrap_or(original_key);
    let key = resolve_key(store, base);
    if key != base {
        warn!(
            original_key,
            wanted = base,
            stored_as = %key,
            "merge.key_conflict"
        );
    }
    store.insert(key.clone(), stripped);
    key
}

/// Fold a sequence of `(original_key, raw_text)` pairs into `existing`.
///
/// Entries are processed in sequence order; nothing is ever deleted or
/// overwritten, so the result holds exactly `existing.len() + entries` keys.
pub fn merge(
    existing: RecordStore,
    entries: impl IntoIterator<Item = (String, String)>,
) -> RecordStore {
    let mut store = existing;
    for (original_key, raw_text) in entries {
        fold_entry(&mut store, &original_key, &raw_text);
    }
    store
}

/// One-time re-keying migration: derive every key from content, strip the
/// heading from every value.
///
/// Entries are replayed in descending stored order so conflict suffixes land
/// deterministically. Count preservation is structural: each input entry
/// produces exactly one output entry.
pub fn rekey(store: RecordStore) -> RecordStore {
    let mut migrated = RecordStore::new();
    for (original_key, content) in store.into_iter().rev() {
        let stored_as = fold_entry(&mut migrated, &original_key, &content);
        if stored_as != original_key {
            debug!(from = %original_key, to = %stored_as, "merge.rekeyed");
        }
    }
    migrated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(pairs: &[(&str, &str)]) -> RecordStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn merge_into_empty_keeps_every_entry() {
        let entries = vec![
            ("2026-02-06".to_string(), "20260206 W.O.D!!\n\nA".to_string()),
            ("2026-02-05".to_string(), "20260205 W.O.D!!\n\nB".to_string()),
            ("2026-02-04".to_string(), "20260204 W.O.D!!\n\nC".to_string()),
        ];
        let merged = merge(RecordStore::new(), entries);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["2026-02-06"], "A");
        assert_eq!(merged["2026-02-04"], "C");
    }

    #[test]
    fn content_date_beats_original_key() {
        let merged = merge(
            RecordStore::new(),
            vec![(
                "2023-01-25".to_string(),
                "20230124 W.O.D!!\n\nFor time".to_string(),
            )],
        );
        assert!(merged.contains_key("2023-01-24"));
        assert!(!merged.contains_key("2023-01-25"));
        assert_eq!(merged["2023-01-24"], "For time");
    }

    #[test]
    fn falls_back_to_original_key() {
        let merged = merge(
            RecordStore::new(),
            vec![(
                "2026-02-05".to_string(),
                "Some workout without prefix".to_string(),
            )],
        );
        assert_eq!(merged["2026-02-05"], "Some workout without prefix");
    }

    #[test]
    fn collision_yields_suffixed_second_key() {
        let merged = merge(
            RecordStore::new(),
            vec![
                (
                    "2023-01-24".to_string(),
                    "20230124 W.O.D!!\n\nWorkout A".to_string(),
                ),
                (
                    "2023-01-25".to_string(),
                    "20230124 W.O.D!!\n\nWorkout B".to_string(),
                ),
            ],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["2023-01-24"], "Workout A");
        assert_eq!(merged["2023-01-24-2"], "Workout B");
    }

    #[test]
    fn collision_suffix_skips_taken_slots() {
        let existing = store_of(&[("2023-01-24", "a"), ("2023-01-24-2", "b")]);
        let merged = merge(
            existing,
            vec![(
                "x".to_string(),
                "20230124 W.O.D!!\n\nWorkout C".to_string(),
            )],
        );
        assert_eq!(merged["2023-01-24-3"], "Workout C");
    }

    #[test]
    fn collision_with_prior_store_key_never_overwrites() {
        let existing = store_of(&[("2023-01-24", "kept")]);
        let merged = merge(
            existing,
            vec![("2023-01-24".to_string(), "new body".to_string())],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["2023-01-24"], "kept");
        assert_eq!(merged["2023-01-24-2"], "new body");
    }

    #[test]
    fn empty_stripped_content_is_stored() {
        let merged = merge(
            RecordStore::new(),
            vec![("2026-02-06".to_string(), "20260206 W.O.D!!".to_string())],
        );
        assert_eq!(merged["2026-02-06"], "");
    }

    #[test]
    fn descending_iteration_is_reverse_chronological() {
        let merged = merge(
            RecordStore::new(),
            vec![
                ("2023-01-02".to_string(), "20230102 W.O.D!!\n\nFran".to_string()),
                ("2026-02-06".to_string(), "20260206 W.O.D!!\n\nFor time".to_string()),
                ("2024-06-15".to_string(), "20240615 W.O.D!!\n\nAmrap".to_string()),
            ],
        );
        let keys: Vec<&String> = merged.keys().rev().collect();
        let mut sorted = keys.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(keys, sorted);
        assert_eq!(keys[0], "2026-02-06");
    }

    #[test]
    fn rekey_strips_prefix_from_values() {
        let migrated = rekey(store_of(&[(
            "2026-02-06",
            "20260206 W.O.D!!\n\nFor time of: (in 23min)",
        )]));
        assert_eq!(migrated["2026-02-06"], "For time of: (in 23min)");
    }

    #[test]
    fn rekey_moves_entry_to_content_date() {
        let migrated = rekey(store_of(&[("2023-01-25", "20230124 W.O.D!!\n\nFor time")]));
        assert!(migrated.contains_key("2023-01-24"));
        assert!(!migrated.contains_key("2023-01-25"));
    }

    #[test]
    fn rekey_preserves_entry_without_heading() {
        let migrated = rekey(store_of(&[("2026-02-06", "For time of: 21-15-9 thrusters")]));
        assert_eq!(migrated["2026-02-06"], "For time of: 21-15-9 thrusters");
    }

    #[test]
    fn rekey_handles_double_date_content() {
        let migrated = rekey(store_of(&[(
            "2023-01-24",
            "20230124 W.O.D!!\n\n20230125 \nComplete as many rounds",
        )]));
        assert_eq!(migrated["2023-01-24"], "20230125 \nComplete as many rounds");
    }

    #[test]
    fn rekey_preserves_total_count_under_conflicts() {
        let migrated = rekey(store_of(&[
            ("2023-01-24", "20230124 W.O.D!!\n\nWorkout A"),
            ("2023-01-25", "20230124 W.O.D!!\n\nWorkout B"),
        ]));
        assert_eq!(migrated.len(), 2);
        assert!(migrated.contains_key("2023-01-24"));
        assert!(migrated.keys().any(|k| k.starts_with("2023-01-24-")));
    }

    #[test]
    fn rekey_of_empty_store_is_empty() {
        assert!(rekey(RecordStore::new()).is_empty());
    }

    #[test]
    fn rekey_mixed_with_and_without_heading() {
        let migrated = rekey(store_of(&[
            ("2026-02-06", "20260206 W.O.D!!\n\nFor time"),
            ("2026-02-05", "Some workout without prefix"),
        ]));
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated["2026-02-06"], "For time");
        assert_eq!(migrated["2026-02-05"], "Some workout without prefix");
    }
}
