//! Property-based testing for the comparator
//!
//! Snapshots are generated in memory from small path, hash and mtime
//! alphabets so that shared paths, renames and duplicate hashes all show up
//! often.

use ::bitrot::*;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
}

/// Generate a snapshot with colliding paths and hashes
fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map("[a-f]{1,2}(/[a-c])?", ("[u-z]", 0..3i64), 0..24).prop_map(
        |entries| {
            SnapshotBuilder::new("/prop")
                .created_at(ts(100))
                .extend(
                    entries
                        .into_iter()
                        .map(|(path, (hash, mtime))| (path, ContentRecord::new(hash, ts(mtime)))),
                )
                .build()
        },
    )
}

fn all_paths(old: &Snapshot, new: &Snapshot) -> BTreeSet<String> {
    old.paths().chain(new.paths()).map(str::to_string).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every path lands in exactly one category
    #[test]
    fn categories_partition_all_paths(old in snapshot_strategy(), new in snapshot_strategy()) {
        let expected = all_paths(&old, &new);
        let comparison = classify(old, new);

        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let singles = [
            comparison.unchanged_paths(),
            comparison.modified_paths(),
            comparison.flagged_paths(),
            comparison.added_paths(),
            comparison.deleted_paths(),
        ];
        for set in singles {
            for path in set {
                *seen.entry(path.clone()).or_default() += 1;
            }
        }
        for pair in comparison.renamed_paths() {
            *seen.entry(pair.old_path.clone()).or_default() += 1;
            *seen.entry(pair.new_path.clone()).or_default() += 1;
        }

        prop_assert!(seen.values().all(|&count| count == 1), "a path was classified twice: {:?}", seen);
        prop_assert_eq!(seen.keys().cloned().collect::<BTreeSet<_>>(), expected);
    }

    /// Shared paths are classified by hash first, then by mtime
    #[test]
    fn shared_paths_follow_hash_then_mtime(old in snapshot_strategy(), new in snapshot_strategy()) {
        let comparison = classify(old.clone(), new.clone());

        for (path, old_record) in old.entries() {
            let Some(new_record) = new.get(path) else { continue };
            if old_record.hash == new_record.hash {
                prop_assert!(comparison.unchanged_paths().contains(path));
            } else if old_record.modified != new_record.modified {
                prop_assert!(comparison.modified_paths().contains(path));
            } else {
                prop_assert!(comparison.flagged_paths().contains(path));
            }
        }
    }

    /// Rename pairs join an old-only and a new-only path with equal hashes
    #[test]
    fn renames_are_one_sided_and_hash_equal(old in snapshot_strategy(), new in snapshot_strategy()) {
        let comparison = classify(old.clone(), new.clone());

        let mut new_sides = BTreeSet::new();
        for pair in comparison.renamed_paths() {
            prop_assert!(!new.contains(&pair.old_path));
            prop_assert!(!old.contains(&pair.new_path));
            prop_assert_eq!(&old.get(&pair.old_path).unwrap().hash, &new.get(&pair.new_path).unwrap().hash);
            prop_assert!(new_sides.insert(pair.new_path.clone()), "new path paired twice");
        }

        // No deleted path could still have been paired with an added one
        for deleted in comparison.deleted_paths() {
            let hash = &old.get(deleted).unwrap().hash;
            prop_assert!(comparison.added_paths().iter().all(|a| &new.get(a).unwrap().hash != hash));
        }
    }

    /// Comparing a snapshot with itself finds nothing
    #[test]
    fn same_snapshot_is_all_unchanged(snapshot in snapshot_strategy()) {
        let len = snapshot.len();
        let comparison = classify(snapshot.clone(), snapshot);

        prop_assert_eq!(comparison.unchanged_paths().len(), len);
        prop_assert_eq!(comparison.total_checked(), len);
        prop_assert!(!comparison.has_changes());
        prop_assert!(comparison.success());
    }

    /// The result is computed once and every accessor reads the same cache
    #[test]
    fn classification_is_cached(old in snapshot_strategy(), new in snapshot_strategy()) {
        let comparison = Comparison::new(old.clone(), new.clone());
        prop_assert_eq!(comparison.state(), ComparisonState::Pending);

        let first: *const Classification = comparison.classification();
        let stats = comparison.stats();
        prop_assert_eq!(comparison.state(), ComparisonState::Complete);
        prop_assert!(std::ptr::eq(first, comparison.classification()));
        prop_assert_eq!(comparison.stats(), stats);

        // A fresh comparison of the same inputs agrees
        let again = classify(old, new);
        prop_assert_eq!(again.classification(), comparison.classification());
        prop_assert_eq!(comparison.success(), comparison.flagged_paths().is_empty());
        prop_assert_eq!(comparison.total_checked(), stats.total());
    }
}
