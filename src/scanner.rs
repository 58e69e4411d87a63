//! Directory scanning: produce a [`Snapshot`] from a directory tree
//!
//! The scanner walks the tree in parallel with the `ignore` crate, skips
//! excluded names and anything that is not a regular file, then hashes every
//! remaining file on a rayon pool.
//!
//! Unlike a backup tool, bitrot must see every file, so none of the usual
//! walker filters apply: hidden files are scanned and `.gitignore` files are
//! not honoured. Only the [`ExclusionPolicy`] prunes the walk.
//!
//! ## Atomic failure
//!
//! A snapshot with missing entries would later show up as spurious
//! deletions and additions. Any error while walking, stat'ing or reading a
//! file therefore aborts the whole scan; no partial snapshot is ever
//! returned.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitrot::scanner::Scanner;
//! use bitrot::config::Config;
//! use bitrot::types::ProgressInfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_default()?;
//! let scanner = Scanner::new("/srv/archive")
//!     .with_exclusions(config.exclusion_policy())
//!     .with_parallel_workers(4);
//!
//! let snapshot = scanner.scan::<fn(ProgressInfo)>(None)?;
//! println!("Hashed {} files", snapshot.len());
//! # Ok(())
//! # }
//! ```

use crate::config::ExclusionPolicy;
use crate::error::{BitrotError, Result};
use crate::snapshot::Snapshot;
use crate::types::{ContentRecord, ProgressInfo};
use crate::utils;
use chrono::{DateTime, Utc};
use ignore::{WalkBuilder, WalkState};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Times a file is re-hashed when it is written to during hashing
const MAX_HASH_ATTEMPTS: usize = 3;

/// Produces snapshots of one directory tree
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Root directory to scan
    root_path: PathBuf,
    /// Names pruned from the walk
    exclusions: ExclusionPolicy,
    /// Whether to follow symbolic links during traversal
    follow_symlinks: bool,
    /// Number of walker and hashing threads
    parallel_workers: usize,
}

impl Scanner {
    /// Create a scanner with default settings
    ///
    /// - no exclusions
    /// - symbolic links are not followed (and therefore not hashed)
    /// - one worker per CPU core
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            exclusions: ExclusionPolicy::default(),
            follow_symlinks: false,
            parallel_workers: num_cpus::get(),
        }
    }

    /// Set the exclusion policy
    pub fn with_exclusions(mut self, exclusions: ExclusionPolicy) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Follow symbolic links; linked regular files are then hashed
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set number of parallel workers (minimum 1)
    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Root directory this scanner covers
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Scan the tree and build a snapshot
    ///
    /// # Errors
    ///
    /// - [`BitrotError::InvalidRoot`] if the root is missing or not a directory
    /// - [`BitrotError::ScanFailed`] if any file cannot be stat'ed or read
    /// - [`BitrotError::PathConversion`] if a path is not valid UTF-8
    /// - [`BitrotError::Walk`] for other walker failures (e.g. symlink loops)
    pub fn scan<F>(&self, progress_callback: Option<F>) -> Result<Snapshot>
    where
        F: Fn(ProgressInfo) + Send + Sync,
    {
        let created_at = Utc::now();
        let start = Instant::now();

        match fs::metadata(&self.root_path) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return Err(BitrotError::InvalidRoot(self.root_path.clone())),
        }

        info!("Scanning {:?}", self.root_path);

        let paths = self.collect_paths()?;
        let total = paths.len();
        debug!("Walk found {} regular files in {:?}", total, start.elapsed());

        let processed = AtomicUsize::new(0);
        let bytes_processed = AtomicU64::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers)
            .build()
            .map_err(|e| BitrotError::internal(format!("Failed to build thread pool: {}", e)))?;

        let records: Vec<(String, ContentRecord)> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let key = utils::relative_key(path, &self.root_path)?;
                    let (record, size) = hash_file_with_size(path)?;
                    trace!("Hashed {}: {}", key, record.hash);

                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    let bytes = bytes_processed.fetch_add(size, Ordering::Relaxed) + size;
                    if let Some(ref callback) = progress_callback {
                        callback(ProgressInfo {
                            operation: "Hashing files".to_string(),
                            current_item: Some(key.clone()),
                            processed: done,
                            total: Some(total),
                            bytes_processed: bytes,
                        });
                    }

                    Ok((key, record))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let entries: BTreeMap<String, ContentRecord> = records.into_iter().collect();

        info!(
            "Scanned {} files ({}) in {:?}",
            entries.len(),
            utils::format_bytes(bytes_processed.load(Ordering::Relaxed)),
            start.elapsed()
        );

        Ok(Snapshot::new(self.root_path.clone(), created_at, entries))
    }

    /// Walk the tree and return every regular file that is not excluded
    fn collect_paths(&self) -> Result<Vec<PathBuf>> {
        let mut walker_builder = WalkBuilder::new(&self.root_path);

        walker_builder
            .standard_filters(false) // No gitignore, no hidden-file skipping
            .follow_links(self.follow_symlinks)
            .threads(self.parallel_workers);

        let exclusions = self.exclusions.clone();
        walker_builder.filter_entry(move |entry| {
            entry.depth() == 0 || !exclusions.is_excluded_name(entry.file_name())
        });

        let paths = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        let first_error = Arc::new(Mutex::new(None::<BitrotError>));

        walker_builder.build_parallel().run(|| {
            let paths = Arc::clone(&paths);
            let first_error = Arc::clone(&first_error);

            Box::new(move |entry_result| match entry_result {
                Ok(entry) => {
                    match entry.file_type() {
                        Some(file_type) if file_type.is_file() => {
                            paths.lock().push(entry.into_path());
                        }
                        Some(file_type) if !file_type.is_dir() => {
                            trace!("Skipping non-regular entry {:?}", entry.path());
                        }
                        _ => {}
                    }
                    WalkState::Continue
                }
                Err(e) => {
                    let mut slot = first_error.lock();
                    if slot.is_none() {
                        *slot = Some(walk_error(e));
                    }
                    WalkState::Quit
                }
            })
        });

        if let Some(err) = first_error.lock().take() {
            return Err(err);
        }

        let mut paths = std::mem::take(&mut *paths.lock());
        paths.sort();
        Ok(paths)
    }
}

/// Hash one file and record its modification time
///
/// # Errors
///
/// [`BitrotError::ScanFailed`] if the file cannot be read or stat'ed.
pub fn hash_file(path: &Path) -> Result<ContentRecord> {
    hash_file_with_size(path).map(|(record, _)| record)
}

fn hash_file_with_size(path: &Path) -> Result<(ContentRecord, u64)> {
    let fail = |e: io::Error| BitrotError::scan_failed(path, e);

    for attempt in 1..=MAX_HASH_ATTEMPTS {
        // Content and metadata come from one handle, so a rename over the
        // path mid-hash cannot pair one version's hash with another's mtime
        let mut file = File::open(path).map_err(fail)?;
        let before = file.metadata().map_err(fail)?;
        let hash = utils::hash_reader(&mut file).map_err(fail)?;
        let after = file.metadata().map_err(fail)?;

        let modified = after.modified().map_err(fail)?;
        if before.len() == after.len() && before.modified().map_err(fail)? == modified {
            return Ok((
                ContentRecord::new(hash, DateTime::<Utc>::from(modified)),
                after.len(),
            ));
        }

        debug!("{:?} changed while being hashed (attempt {})", path, attempt);
    }

    Err(fail(io::Error::other(format!(
        "file kept changing while being hashed ({} attempts)",
        MAX_HASH_ATTEMPTS
    ))))
}

/// Convert a walker error, keeping the offending path when there is one
fn walk_error(err: ignore::Error) -> BitrotError {
    match err {
        ignore::Error::WithPath { path, err } => {
            let message = format!("{}: {}", path.display(), err);
            match (*err).into_io_error() {
                Some(io) => BitrotError::scan_failed(path, io),
                None => BitrotError::Walk(message),
            }
        }
        ignore::Error::WithDepth { err, .. } => walk_error(*err),
        other => other.into(),
    }
}
