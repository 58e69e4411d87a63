//! Error types for the bitrot library
//!
//! Comparing two snapshots cannot fail, so every variant here belongs to one
//! of the collaborators around the comparator: the scanner, the snapshot
//! store, or configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the bitrot library
pub type Result<T> = std::result::Result<T, BitrotError>;

/// Main error type for all bitrot operations
#[derive(Debug, Error)]
pub enum BitrotError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the directory walker
    #[error("Walk directory error: {0}")]
    Walk(String),

    /// A file could not be stat'ed or read while scanning.
    ///
    /// The whole scan is abandoned when this happens.
    #[error("Scan failed at {path:?}: {source}")]
    ScanFailed {
        /// File that could not be processed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Scan root is missing or is not a directory
    #[error("Not a directory: {0:?}")]
    InvalidRoot(PathBuf),

    /// Path cannot be represented as UTF-8
    #[error("Path conversion error: {0:?}")]
    PathConversion(std::ffi::OsString),

    /// A persisted snapshot could not be decoded
    #[error("Snapshot file {path:?} is unreadable: {reason}")]
    SnapshotCorrupt {
        /// Offending snapshot file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or unresolvable configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ignore::Error> for BitrotError {
    fn from(err: ignore::Error) -> Self {
        let message = err.to_string();
        match err.into_io_error() {
            Some(io) => BitrotError::Io(io),
            None => BitrotError::Walk(message),
        }
    }
}

impl BitrotError {
    /// Create a storage error with a custom message
    pub fn storage(msg: impl Into<String>) -> Self {
        BitrotError::Storage(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        BitrotError::Config(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        BitrotError::Internal(msg.into())
    }

    /// Wrap an I/O error with the file it happened on
    pub fn scan_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BitrotError::ScanFailed {
            path: path.into(),
            source,
        }
    }

    /// Check if retrying the operation could succeed.
    ///
    /// Files disappearing or being locked mid-scan are transient; a missing
    /// root or a corrupt snapshot file is not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BitrotError::ScanFailed { source, .. } | BitrotError::Io(source) => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            BitrotError::Walk(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            BitrotError::InvalidRoot(path) => {
                format!("{:?} is not a directory. Pass the directory you want to check.", path)
            }
            BitrotError::ScanFailed { path, source } => {
                format!(
                    "Could not read {:?} ({}). The scan was aborted and no snapshot was saved.",
                    path, source
                )
            }
            BitrotError::SnapshotCorrupt { path, reason } => {
                format!(
                    "Stored snapshot {:?} is unreadable ({}). Move it aside to start a fresh history.",
                    path, reason
                )
            }
            BitrotError::PathConversion(name) => {
                format!("File name {:?} is not valid UTF-8 and cannot be tracked.", name)
            }
            _ => self.to_string(),
        }
    }
}
