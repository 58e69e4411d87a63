//! Snapshot definitions
//!
//! A [`Snapshot`] is one scan of a directory tree at a point in time: the
//! root that was scanned, when the scan started, and a record of every
//! regular file found, keyed by its path relative to the root.
//!
//! Snapshots are immutable once built. The scanner and the store create them
//! wholesale; [`SnapshotBuilder`] exists for callers that assemble entries
//! themselves (tests, importers).
//!
//! ## Examples
//!
//! ```rust
//! use bitrot::snapshot::SnapshotBuilder;
//! use bitrot::types::ContentRecord;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let snapshot = SnapshotBuilder::new("/data/photos")
//!     .created_at(now)
//!     .insert("2023/beach.jpg", ContentRecord::new("9f86d0", now))
//!     .insert("2023/hike.jpg", ContentRecord::new("60303a", now))
//!     .build();
//!
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot.get("2023/beach.jpg").unwrap().hash, "9f86d0");
//! ```

use crate::types::ContentRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Point-in-time record of a directory tree
///
/// Entries are kept in a `BTreeMap` so that serialized snapshots are stable
/// and diffable; nothing in the comparator depends on that order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    root_path: PathBuf,
    created_at: DateTime<Utc>,
    entries: BTreeMap<String, ContentRecord>,
}

impl Snapshot {
    /// Create a snapshot from a complete entry set
    pub fn new(
        root_path: impl Into<PathBuf>,
        created_at: DateTime<Utc>,
        entries: BTreeMap<String, ContentRecord>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            created_at,
            entries,
        }
    }

    /// Directory this snapshot describes
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// When the scan that produced this snapshot started
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// All entries, keyed by relative path
    pub fn entries(&self) -> &BTreeMap<String, ContentRecord> {
        &self.entries
    }

    /// Look up one relative path
    pub fn get(&self, path: &str) -> Option<&ContentRecord> {
        self.entries.get(path)
    }

    /// Whether a relative path is present
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over relative paths
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no files were recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line description for listings
    pub fn display_format(&self) -> String {
        format!(
            "{} {} ({} files)",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.root_path.display(),
            self.entries.len()
        )
    }
}

/// Builder for [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    root_path: PathBuf,
    created_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, ContentRecord>,
}

impl SnapshotBuilder {
    /// Start a snapshot of `root_path`
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            created_at: None,
            entries: BTreeMap::new(),
        }
    }

    /// Set the creation time (defaults to now at build time)
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Add a record; a later insert for the same path replaces the earlier one
    pub fn insert(mut self, path: impl Into<String>, record: ContentRecord) -> Self {
        self.entries.insert(path.into(), record);
        self
    }

    /// Add many records at once
    pub fn extend<I, P>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = (P, ContentRecord)>,
        P: Into<String>,
    {
        self.entries
            .extend(records.into_iter().map(|(path, record)| (path.into(), record)));
        self
    }

    /// Finish the snapshot
    pub fn build(self) -> Snapshot {
        Snapshot {
            root_path: self.root_path,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            entries: self.entries,
        }
    }
}
