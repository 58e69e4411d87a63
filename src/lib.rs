//! # Bitrot - silent data corruption detection for directory trees
//!
//! Bitrot records the content hash and modification time of every file in a
//! directory tree, and on the next run compares the new state with the
//! previous one.
//!
//! ## Overview
//!
//! Every path seen in either run lands in exactly one category:
//!
//! - **unchanged**: same content
//! - **modified**: content and modification time both changed (a normal edit)
//! - **flagged**: content changed but the modification time did not, which
//!   ordinary tools never do and is the signature of silent corruption
//! - **added** / **deleted**: present on one side only
//! - **renamed**: an old-only and a new-only path with the same content
//!
//! A check succeeds when nothing is flagged.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bitrot::BitrotBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bitrot = BitrotBuilder::new().build()?;
//!
//! let report = bitrot.check("./photos")?;
//! match &report.comparison {
//!     None => println!("Baseline recorded ({} files)", report.snapshot.len()),
//!     Some(comparison) => {
//!         println!("Checked {} files", comparison.total_checked());
//!         for path in comparison.flagged_paths() {
//!             println!("CORRUPTED? {}", path);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Comparing snapshots directly
//!
//! The comparator works on any two [`Snapshot`]s, however they were made:
//!
//! ```rust
//! use bitrot::{classify, ContentRecord, SnapshotBuilder};
//! use chrono::{TimeZone, Utc};
//!
//! let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
//!
//! let old = SnapshotBuilder::new("/data")
//!     .insert("edited.txt", ContentRecord::new("aaa", t1))
//!     .insert("rotted.txt", ContentRecord::new("bbb", t1))
//!     .build();
//! let new = SnapshotBuilder::new("/data")
//!     .insert("edited.txt", ContentRecord::new("ccc", t2))
//!     .insert("rotted.txt", ContentRecord::new("ddd", t1))
//!     .build();
//!
//! let comparison = classify(old, new);
//! assert!(comparison.modified_paths().contains("edited.txt"));
//! assert!(comparison.flagged_paths().contains("rotted.txt"));
//! assert!(!comparison.success());
//! ```
//!
//! ## Module Organization
//!
//! - [`comparison`]: classification of two snapshots, cached once
//! - [`snapshot`]: the immutable snapshot value and its builder
//! - [`scanner`]: parallel walk and SHA-256 hashing of a tree
//! - [`storage`]: JSON snapshot store
//! - [`config`]: configuration directory and excluded names
//! - [`bitrot`]: the scan / compare / save facade
//! - [`types`]: shared value types
//! - [`error`]: error types

// Public API modules
pub mod bitrot;
pub mod comparison;
pub mod config;
pub mod error;
pub mod scanner;
pub mod snapshot;
pub mod storage;
pub mod types;

// Internal modules (not part of public API)
mod collections;
mod utils;

// Re-export main types for convenience
pub use bitrot::{Bitrot, BitrotBuilder, CheckReport};
pub use comparison::{classify, Classification, Comparison, ComparisonState};
pub use config::{Config, ExclusionPolicy};
pub use error::{BitrotError, Result};
pub use scanner::Scanner;
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use storage::{SnapshotStore, SnapshotSummary};
pub use types::*;
