//! Snapshot persistence
//!
//! Snapshots are stored as pretty-printed JSON, one file per scan, grouped by
//! the directory they describe:
//!
//! ```text
//! storage_root/
//! ├── metadata.json                        # Store format and version
//! └── <root-key>/                          # First 16 hex chars of SHA-256(abs root)
//!     ├── 20260101T120000.000000000Z.json  # One snapshot per scan
//!     └── 20260201T120000.000000000Z.json
//! ```
//!
//! File names sort chronologically, so the newest snapshot is simply the
//! largest name. Writes go through `utils::atomic_write`: an interrupted
//! save never leaves a truncated snapshot behind.

use crate::error::{BitrotError, Result};
use crate::snapshot::Snapshot;
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Newest store layout this build understands
pub const FORMAT_VERSION: u32 = 1;

const METADATA_FILE_NAME: &str = "metadata.json";
const SNAPSHOT_EXTENSION: &str = "json";
const ROOT_KEY_LEN: usize = 16;

/// Contents of `metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreMetadata {
    /// Layout version
    pub format_version: u32,
    /// Version of bitrot that created the store
    pub bitrot_version: String,
    /// When the store was created
    pub created_at: DateTime<Utc>,
}

/// One stored snapshot as listed by [`SnapshotStore::history`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// When the scan started
    pub created_at: DateTime<Utc>,
    /// Number of files recorded
    pub file_count: usize,
    /// Location of the snapshot file
    pub path: PathBuf,
}

/// Directory of persisted snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    metadata: StoreMetadata,
}

impl SnapshotStore {
    /// Open the store at `root`, creating it on first use
    ///
    /// # Errors
    ///
    /// [`BitrotError::Storage`] if the store was written by a newer layout
    /// version than this build supports.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let metadata_path = root.join(METADATA_FILE_NAME);
        let metadata = if metadata_path.exists() {
            let metadata_json = fs::read_to_string(&metadata_path)?;
            let metadata: StoreMetadata = serde_json::from_str(&metadata_json)?;
            if metadata.format_version > FORMAT_VERSION {
                return Err(BitrotError::storage(format!(
                    "store at {:?} uses format version {}, this build supports up to {}",
                    root, metadata.format_version, FORMAT_VERSION
                )));
            }
            debug!("Opened snapshot store at {:?}", root);
            metadata
        } else {
            let metadata = StoreMetadata {
                format_version: FORMAT_VERSION,
                bitrot_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: Utc::now(),
            };
            let metadata_json = serde_json::to_string_pretty(&metadata)?;
            utils::atomic_write(&metadata_path, metadata_json.as_bytes())?;
            info!("Initialized snapshot store at {:?}", root);
            metadata
        };

        Ok(Self { root, metadata })
    }

    /// Store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store metadata
    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    /// Persist a snapshot and return the file it was written to
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let dir = self.root_dir(snapshot.root_path());
        fs::create_dir_all(&dir)?;

        let file_name = format!(
            "{}.{}",
            snapshot.created_at().format("%Y%m%dT%H%M%S%.9fZ"),
            SNAPSHOT_EXTENSION
        );
        let path = dir.join(file_name);

        let json = serde_json::to_string_pretty(snapshot)?;
        utils::atomic_write(&path, json.as_bytes())?;

        info!(
            "Saved snapshot of {:?} ({} files) to {:?}",
            snapshot.root_path(),
            snapshot.len(),
            path
        );
        Ok(path)
    }

    /// Most recent snapshot of `root`, or `None` if it was never scanned
    pub fn latest(&self, root: &Path) -> Result<Option<Snapshot>> {
        match self.snapshot_files(root)?.pop() {
            Some(path) => self.load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// All stored snapshots of `root`, oldest first
    pub fn history(&self, root: &Path) -> Result<Vec<SnapshotSummary>> {
        self.snapshot_files(root)?
            .into_iter()
            .map(|path| {
                let snapshot = self.load(&path)?;
                Ok(SnapshotSummary {
                    created_at: snapshot.created_at(),
                    file_count: snapshot.len(),
                    path,
                })
            })
            .collect()
    }

    /// Load one snapshot file
    ///
    /// # Errors
    ///
    /// [`BitrotError::SnapshotCorrupt`] naming the file if it cannot be read
    /// or decoded.
    pub fn load(&self, path: &Path) -> Result<Snapshot> {
        let corrupt = |reason: String| BitrotError::SnapshotCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let json = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let snapshot: Snapshot = serde_json::from_str(&json).map_err(|e| corrupt(e.to_string()))?;

        trace!("Loaded snapshot {:?} ({} files)", path, snapshot.len());
        Ok(snapshot)
    }

    /// Directory holding the snapshots of `root`
    pub fn root_dir(&self, root: &Path) -> PathBuf {
        self.root.join(root_key(root))
    }

    /// Snapshot files of `root`, sorted oldest first
    fn snapshot_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let dir = self.root_dir(root);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            // Leftover temp files from an interrupted save have no extension
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
            {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Storage directory name for a scanned root
///
/// The root is made absolute (and canonical when it exists) first, so
/// `./photos` and `/home/me/photos` share one history.
pub fn root_key(root: &Path) -> String {
    let absolute = fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf());
    let digest = utils::hash_data(absolute.to_string_lossy().as_bytes());
    digest[..ROOT_KEY_LEN].to_string()
}
