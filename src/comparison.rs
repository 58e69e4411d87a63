//! Snapshot comparison and change classification
//!
//! Given an old and a new [`Snapshot`] of the same directory, every relative
//! path seen in either one is put into exactly one of six outcome sets:
//!
//! | Outcome     | Condition                                                   |
//! |-------------|-------------------------------------------------------------|
//! | unchanged   | in both, same hash (modification time is ignored)           |
//! | modified    | in both, hash changed and modification time changed         |
//! | flagged     | in both, hash changed but modification time did **not**     |
//! | renamed     | old-only path and new-only path with the same hash          |
//! | deleted     | old-only, no rename partner                                 |
//! | added       | new-only, no rename partner                                 |
//!
//! A flagged path is the corruption signal: the content changed behind the
//! filesystem's back. Everything else is informational.
//!
//! ## Rename pairing
//!
//! Old-only paths are visited in lexicographic order and each takes the
//! lexicographically smallest unpaired new-only path carrying the same hash.
//! When a hash had more than one candidate on either side the pairing was a
//! tie-break, and that hash is reported in
//! [`Comparison::ambiguous_hashes`].
//!
//! ## Caching
//!
//! A [`Comparison`] starts [`ComparisonState::Pending`] and is classified the
//! first time any result is requested. The result is stored in a `OnceLock`,
//! so concurrent callers trigger exactly one classification and all of them
//! observe the same cached sets afterwards.
//!
//! ## Example
//!
//! ```rust
//! use bitrot::comparison::classify;
//! use bitrot::snapshot::SnapshotBuilder;
//! use bitrot::types::ContentRecord;
//! use chrono::{Duration, Utc};
//!
//! let then = Utc::now() - Duration::days(7);
//! let now = Utc::now();
//!
//! let old = SnapshotBuilder::new("/data")
//!     .insert("report.pdf", ContentRecord::new("aaaa", then))
//!     .insert("photo.raw", ContentRecord::new("bbbb", then))
//!     .build();
//! let new = SnapshotBuilder::new("/data")
//!     .insert("report.pdf", ContentRecord::new("cccc", now))  // edited
//!     .insert("photo.raw", ContentRecord::new("dddd", then))  // rotted
//!     .build();
//!
//! let comparison = classify(old, new);
//! assert!(comparison.modified_paths().contains("report.pdf"));
//! assert!(comparison.flagged_paths().contains("photo.raw"));
//! assert!(!comparison.success());
//! ```

use crate::collections::{HashMap, HashMapExt};
use crate::snapshot::Snapshot;
use crate::types::{ChangeStats, ContentRecord, RenamedPair};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Shared-path count above which per-path outcomes are computed on rayon
pub const PARALLEL_THRESHOLD: usize = 4096;

/// The six disjoint outcome sets of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Same content in both snapshots
    pub unchanged: BTreeSet<String>,
    /// Only in the old snapshot
    pub deleted: BTreeSet<String>,
    /// Content and modification time both changed
    pub modified: BTreeSet<String>,
    /// Content changed, modification time did not
    pub flagged: BTreeSet<String>,
    /// Only in the new snapshot
    pub added: BTreeSet<String>,
    /// Inferred moves
    pub renamed: BTreeSet<RenamedPair>,
    /// Hashes whose rename pairing needed a tie-break
    pub ambiguous_hashes: BTreeSet<String>,
}

impl Classification {
    /// True iff no path was flagged
    pub fn success(&self) -> bool {
        self.flagged.is_empty()
    }

    /// Number of checked units; a rename pair counts once
    pub fn total_checked(&self) -> usize {
        self.stats().total()
    }

    /// Per-category counts
    pub fn stats(&self) -> ChangeStats {
        ChangeStats {
            unchanged: self.unchanged.len(),
            modified: self.modified.len(),
            flagged: self.flagged.len(),
            added: self.added.len(),
            deleted: self.deleted.len(),
            renamed: self.renamed.len(),
        }
    }
}

/// Lifecycle of a [`Comparison`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonState {
    /// Constructed, not yet classified
    Pending,
    /// Classified; results are cached and final
    Complete,
}

/// Comparison of an old and a new snapshot
///
/// Bound to the two snapshots it was created with. There is no way to
/// re-run it against other data: build a new `Comparison` instead.
#[derive(Debug, Clone)]
pub struct Comparison {
    old: Arc<Snapshot>,
    new: Arc<Snapshot>,
    result: OnceLock<Classification>,
}

impl Comparison {
    /// Create a pending comparison; nothing is computed yet
    pub fn new(old: impl Into<Arc<Snapshot>>, new: impl Into<Arc<Snapshot>>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            result: OnceLock::new(),
        }
    }

    /// Old side of the comparison
    pub fn old(&self) -> &Snapshot {
        &self.old
    }

    /// New side of the comparison
    pub fn new_snapshot(&self) -> &Snapshot {
        &self.new
    }

    /// Current lifecycle state
    pub fn state(&self) -> ComparisonState {
        if self.result.get().is_some() {
            ComparisonState::Complete
        } else {
            ComparisonState::Pending
        }
    }

    /// Classify on first use and return the cached result
    pub fn classification(&self) -> &Classification {
        self.result
            .get_or_init(|| classify_snapshots(&self.old, &self.new))
    }

    /// Paths whose content did not change
    pub fn unchanged_paths(&self) -> &BTreeSet<String> {
        &self.classification().unchanged
    }

    /// Paths only present in the old snapshot
    pub fn deleted_paths(&self) -> &BTreeSet<String> {
        &self.classification().deleted
    }

    /// Paths edited in the expected way
    pub fn modified_paths(&self) -> &BTreeSet<String> {
        &self.classification().modified
    }

    /// Paths suspected of silent corruption
    pub fn flagged_paths(&self) -> &BTreeSet<String> {
        &self.classification().flagged
    }

    /// Paths only present in the new snapshot
    pub fn added_paths(&self) -> &BTreeSet<String> {
        &self.classification().added
    }

    /// Inferred renames
    pub fn renamed_paths(&self) -> &BTreeSet<RenamedPair> {
        &self.classification().renamed
    }

    /// Hashes where rename pairing had to pick between candidates
    pub fn ambiguous_hashes(&self) -> &BTreeSet<String> {
        &self.classification().ambiguous_hashes
    }

    /// True iff nothing was flagged
    pub fn success(&self) -> bool {
        self.classification().success()
    }

    /// Number of checked units; a rename pair counts once
    pub fn total_checked(&self) -> usize {
        self.classification().total_checked()
    }

    /// Per-category counts
    pub fn stats(&self) -> ChangeStats {
        self.classification().stats()
    }

    /// Whether anything besides unchanged paths was found
    pub fn has_changes(&self) -> bool {
        self.stats().has_changes()
    }

    /// Mark the comparison complete with whatever is cached (nothing).
    #[cfg(test)]
    pub(crate) fn force_complete(&self) {
        let _ = self.result.set(Classification::default());
    }
}

/// Compare two snapshots and return the completed [`Comparison`]
pub fn classify(old: impl Into<Arc<Snapshot>>, new: impl Into<Arc<Snapshot>>) -> Comparison {
    let comparison = Comparison::new(old, new);
    comparison.classification();
    comparison
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SharedOutcome {
    Unchanged,
    Modified,
    Flagged,
}

fn shared_outcome(old: &ContentRecord, new: &ContentRecord) -> SharedOutcome {
    if old.same_content(new) {
        SharedOutcome::Unchanged
    } else if old.modified != new.modified {
        SharedOutcome::Modified
    } else {
        SharedOutcome::Flagged
    }
}

/// Classify every path of `old` and `new`.
///
/// Pure function over the two entry maps; [`Comparison`] caches its output.
pub fn classify_snapshots(old: &Snapshot, new: &Snapshot) -> Classification {
    let start = Instant::now();
    let mut result = Classification::default();

    // Paths present in both
    let shared: Vec<(&str, &ContentRecord, &ContentRecord)> = old
        .entries()
        .iter()
        .filter_map(|(path, old_record)| {
            new.get(path)
                .map(|new_record| (path.as_str(), old_record, new_record))
        })
        .collect();

    let outcomes: Vec<(&str, SharedOutcome)> = if shared.len() >= PARALLEL_THRESHOLD {
        shared
            .par_iter()
            .map(|(path, o, n)| (*path, shared_outcome(o, n)))
            .collect()
    } else {
        shared
            .iter()
            .map(|(path, o, n)| (*path, shared_outcome(o, n)))
            .collect()
    };

    for (path, outcome) in outcomes {
        let bucket = match outcome {
            SharedOutcome::Unchanged => &mut result.unchanged,
            SharedOutcome::Modified => &mut result.modified,
            SharedOutcome::Flagged => {
                warn!("Content changed without a modification time change: {}", path);
                &mut result.flagged
            }
        };
        bucket.insert(path.to_string());
    }

    // Entry maps iterate in key order, so both lists are sorted
    let old_only: Vec<&str> = old.paths().filter(|p| !new.contains(p)).collect();
    let new_only: Vec<&str> = new.paths().filter(|p| !old.contains(p)).collect();

    let mut candidates: HashMap<&str, VecDeque<&str>> = HashMap::with_capacity(new_only.len());
    for path in &new_only {
        if let Some(record) = new.get(path) {
            candidates.entry(record.hash.as_str()).or_default().push_back(*path);
        }
    }

    let mut old_only_per_hash: HashMap<&str, usize> = HashMap::with_capacity(old_only.len());
    for path in &old_only {
        if let Some(record) = old.get(path) {
            *old_only_per_hash.entry(record.hash.as_str()).or_insert(0) += 1;
        }
    }

    for (hash, queue) in &candidates {
        let old_count = old_only_per_hash.get(hash).copied().unwrap_or(0);
        if old_count > 0 && (old_count > 1 || queue.len() > 1) {
            warn!(
                "Ambiguous rename: {} old and {} new paths share hash {}",
                old_count,
                queue.len(),
                hash
            );
            result.ambiguous_hashes.insert(hash.to_string());
        }
    }

    let mut paired_new: BTreeSet<&str> = BTreeSet::new();
    for path in old_only {
        let partner = old
            .get(path)
            .and_then(|record| candidates.get_mut(record.hash.as_str()))
            .and_then(VecDeque::pop_front);

        match partner {
            Some(new_path) => {
                trace!("Renamed: {} -> {}", path, new_path);
                paired_new.insert(new_path);
                result.renamed.insert(RenamedPair::new(path, new_path));
            }
            None => {
                result.deleted.insert(path.to_string());
            }
        }
    }

    result.added = new_only
        .into_iter()
        .filter(|p| !paired_new.contains(p))
        .map(str::to_string)
        .collect();

    debug!(
        "Classified {} paths in {:?}: {} unchanged, {} modified, {} flagged, {} added, {} deleted, {} renamed",
        result.total_checked(),
        start.elapsed(),
        result.unchanged.len(),
        result.modified.len(),
        result.flagged.len(),
        result.added.len(),
        result.deleted.len(),
        result.renamed.len()
    );

    result
}
