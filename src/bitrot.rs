//! High-level API: scan, compare against the previous snapshot, save
//!
//! [`Bitrot`] ties the [`Scanner`], the [`SnapshotStore`] and the comparator
//! together. One [`Bitrot::check`] is one full integrity pass over a
//! directory tree.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitrot::BitrotBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bitrot = BitrotBuilder::new().parallel_workers(4).build()?;
//! let report = bitrot.check("/srv/archive")?;
//!
//! if let Some(comparison) = &report.comparison {
//!     for path in comparison.flagged_paths() {
//!         eprintln!("possible corruption: {}", path);
//!     }
//! }
//! std::process::exit(if report.success() { 0 } else { 2 });
//! # }
//! ```

use crate::comparison::{classify, Comparison};
use crate::config::Config;
use crate::error::{BitrotError, Result};
use crate::scanner::Scanner;
use crate::snapshot::Snapshot;
use crate::storage::{SnapshotStore, SnapshotSummary};
use crate::types::{ProgressCallback, ProgressInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Outcome of one [`Bitrot::check`]
#[derive(Debug)]
pub struct CheckReport {
    /// Snapshot taken by this check
    pub snapshot: Arc<Snapshot>,
    /// Comparison with the previous snapshot; `None` on the first run
    pub comparison: Option<Comparison>,
    /// Where the new snapshot was saved; `None` for dry runs
    pub saved_to: Option<PathBuf>,
    /// Wall time of the whole check
    pub duration: Duration,
}

impl CheckReport {
    /// Whether this was the first check of the directory
    pub fn is_first_run(&self) -> bool {
        self.comparison.is_none()
    }

    /// True on a first run, or when nothing was flagged
    pub fn success(&self) -> bool {
        self.comparison.as_ref().map_or(true, Comparison::success)
    }
}

/// Integrity checker bound to one configuration and snapshot store
pub struct Bitrot {
    config: Config,
    store: SnapshotStore,
    follow_symlinks: bool,
    parallel_workers: usize,
    dry_run: bool,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for Bitrot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitrot")
            .field("config", &self.config)
            .field("store", &self.store.root())
            .field("follow_symlinks", &self.follow_symlinks)
            .field("parallel_workers", &self.parallel_workers)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Bitrot {
    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot store in use
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Scan `root`, compare it with its latest stored snapshot and save the
    /// new snapshot (unless this is a dry run).
    ///
    /// The previous snapshot is loaded before anything is saved, so a check
    /// always compares against the state before it ran.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display()))]
    pub fn check(&self, root: impl AsRef<Path>) -> Result<CheckReport> {
        let start = Instant::now();
        let root = resolve_root(root.as_ref())?;

        let snapshot = Arc::new(self.scan(&root)?);
        let previous = self.store.latest(&root)?;

        let comparison = previous.map(|old| {
            info!(
                "Comparing against snapshot from {}",
                old.created_at().format("%Y-%m-%d %H:%M:%S")
            );
            classify(old, Arc::clone(&snapshot))
        });

        if let Some(ref comparison) = comparison {
            let stats = comparison.stats();
            info!(
                "Checked {} files: {} unchanged, {} modified, {} added, {} deleted, {} renamed, {} flagged",
                comparison.total_checked(),
                stats.unchanged,
                stats.modified,
                stats.added,
                stats.deleted,
                stats.renamed,
                stats.flagged
            );
            if !comparison.success() {
                warn!("{} files may be corrupted", stats.flagged);
            }
        } else {
            info!("No previous snapshot of {:?}; recording baseline", root);
        }

        let saved_to = if self.dry_run {
            None
        } else {
            Some(self.store.save(&snapshot)?)
        };

        Ok(CheckReport {
            snapshot,
            comparison,
            saved_to,
            duration: start.elapsed(),
        })
    }

    /// Scan `root` and save the result without comparing
    ///
    /// Returns the snapshot and, unless this is a dry run, where it was saved.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display()))]
    pub fn snapshot(&self, root: impl AsRef<Path>) -> Result<(Snapshot, Option<PathBuf>)> {
        let root = resolve_root(root.as_ref())?;
        let snapshot = self.scan(&root)?;
        let saved_to = if self.dry_run {
            None
        } else {
            Some(self.store.save(&snapshot)?)
        };
        Ok((snapshot, saved_to))
    }

    /// Stored snapshots of `root`, oldest first
    pub fn history(&self, root: impl AsRef<Path>) -> Result<Vec<SnapshotSummary>> {
        let root = resolve_root(root.as_ref())?;
        self.store.history(&root)
    }

    /// Most recent stored snapshot of `root`
    pub fn latest(&self, root: impl AsRef<Path>) -> Result<Option<Snapshot>> {
        let root = resolve_root(root.as_ref())?;
        self.store.latest(&root)
    }

    fn scan(&self, root: &Path) -> Result<Snapshot> {
        let scanner = Scanner::new(root)
            .with_exclusions(self.config.exclusion_policy())
            .with_follow_symlinks(self.follow_symlinks)
            .with_parallel_workers(self.parallel_workers);

        let callback = self.progress_callback.clone();
        scanner.scan(callback.map(|cb| move |info: ProgressInfo| cb(info)))
    }
}

/// Canonical form of a scan root, so snapshots of the same directory
/// always share one history
fn resolve_root(root: &Path) -> Result<PathBuf> {
    fs::canonicalize(root).map_err(|_| BitrotError::InvalidRoot(root.to_path_buf()))
}

/// Builder for [`Bitrot`]
pub struct BitrotBuilder {
    config: Option<Config>,
    follow_symlinks: bool,
    parallel_workers: usize,
    dry_run: bool,
    progress_callback: Option<ProgressCallback>,
}

impl BitrotBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self {
            config: None,
            follow_symlinks: false,
            parallel_workers: num_cpus::get(),
            dry_run: false,
            progress_callback: None,
        }
    }

    /// Use this configuration instead of loading `~/.bitrot`
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Follow symbolic links while scanning
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Number of scanning threads (minimum 1)
    pub fn parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Compare without saving the new snapshot
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Receive progress updates while files are hashed
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Load the configuration if none was given and open the store
    pub fn build(self) -> Result<Bitrot> {
        let config = match self.config {
            Some(config) => config,
            None => Config::load_default()?,
        };
        let store = SnapshotStore::open(config.storage_dir())?;

        Ok(Bitrot {
            config,
            store,
            follow_symlinks: self.follow_symlinks,
            parallel_workers: self.parallel_workers,
            dry_run: self.dry_run,
            progress_callback: self.progress_callback,
        })
    }
}

impl Default for BitrotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
