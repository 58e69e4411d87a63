//! Core value types shared by the scanner, the comparator and the store
//!
//! ## Overview
//!
//! - **File state**: [`ContentRecord`] - hash and modification time of one file
//! - **Comparison results**: [`RenamedPair`], [`ChangeStats`]
//! - **Progress**: [`ProgressInfo`] / [`ProgressCallback`] for long scans
//!
//! ## Examples
//!
//! ```rust
//! use bitrot::types::ContentRecord;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let a = ContentRecord::new("abc123", now);
//! let b = ContentRecord::new("abc123", now - chrono::Duration::days(1));
//!
//! // Content equality ignores the modification time
//! assert!(a.same_content(&b));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Observed state of one file at scan time
///
/// The hash is an opaque token: the comparator only ever tests two hashes
/// for equality. `modified` is metadata used to tell an expected edit apart
/// from silent corruption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentRecord {
    /// Content hash (SHA-256 hex when produced by the scanner)
    pub hash: String,
    /// Last modified timestamp
    pub modified: DateTime<Utc>,
}

impl ContentRecord {
    /// Create a record from a hash token and a modification time
    pub fn new(hash: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            modified,
        }
    }

    /// Whether both records describe the same content
    pub fn same_content(&self, other: &ContentRecord) -> bool {
        self.hash == other.hash
    }
}

/// A file inferred to have moved between two snapshots
///
/// `old_path` exists only in the old snapshot, `new_path` only in the new
/// one, and both carry the same content hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenamedPair {
    /// Path in the old snapshot
    pub old_path: String,
    /// Path in the new snapshot
    pub new_path: String,
}

impl RenamedPair {
    /// Create a pair
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }
}

/// Per-category counts of a comparison
///
/// # Examples
///
/// ```rust
/// # use bitrot::types::ChangeStats;
/// let stats = ChangeStats {
///     unchanged: 10,
///     modified: 2,
///     flagged: 1,
///     added: 3,
///     deleted: 1,
///     renamed: 1,
/// };
///
/// assert_eq!(stats.total(), 18);
/// assert!(stats.has_changes());
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeStats {
    /// Paths with identical content
    pub unchanged: usize,
    /// Paths whose content and modification time both changed
    pub modified: usize,
    /// Paths whose content changed while the modification time did not
    pub flagged: usize,
    /// Paths only in the new snapshot
    pub added: usize,
    /// Paths only in the old snapshot
    pub deleted: usize,
    /// Rename pairs (each pair counts once)
    pub renamed: usize,
}

impl ChangeStats {
    /// Check if anything other than unchanged paths was seen
    pub fn has_changes(&self) -> bool {
        self.modified + self.flagged + self.added + self.deleted + self.renamed > 0
    }

    /// Total number of checked units
    pub fn total(&self) -> usize {
        self.unchanged + self.modified + self.flagged + self.added + self.deleted + self.renamed
    }
}

/// Progress callback for long-running scans
pub type ProgressCallback = Arc<dyn Fn(ProgressInfo) + Send + Sync>;

/// Information passed to progress callbacks
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Operation being performed
    pub operation: String,
    /// Current item being processed
    pub current_item: Option<String>,
    /// Items processed so far
    pub processed: usize,
    /// Total items to process (if known)
    pub total: Option<usize>,
    /// Bytes processed so far
    pub bytes_processed: u64,
}

impl ProgressInfo {
    /// Get progress percentage, if the total is known
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.processed as f64 / total as f64) * 100.0
            }
        })
    }
}
