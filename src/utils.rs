//! Utility functions for bitrot
//!
//! - File content hashing (SHA-256, hex encoded)
//! - Relative path keys for snapshot entries
//! - Atomic file writes for the snapshot store
//! - Human-readable byte counts

use crate::error::{BitrotError, Result};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Component, Path};
use tempfile::NamedTempFile;

/// Hash everything left in `reader` using SHA-256
///
/// Reads in 64KB chunks so large files never sit in memory.
/// Returns the digest as a 64-character hexadecimal string.
pub fn hash_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash arbitrary data using SHA-256
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Turn `path` into a snapshot key relative to `base`.
///
/// Keys use `/` as separator on every platform so snapshots taken on one OS
/// compare cleanly on another.
///
/// # Errors
///
/// - [`BitrotError::Internal`] if `path` is not under `base`
/// - [`BitrotError::PathConversion`] if a component is not valid UTF-8
pub fn relative_key(path: &Path, base: &Path) -> Result<String> {
    let relative = path.strip_prefix(base).map_err(|_| {
        BitrotError::internal(format!("Path {:?} is not relative to {:?}", path, base))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(name) = component {
            let name = name
                .to_str()
                .ok_or_else(|| BitrotError::PathConversion(name.to_os_string()))?;
            parts.push(name);
        }
    }

    Ok(parts.join("/"))
}

/// Atomic file write (write to a temp file in the same directory, then rename)
///
/// Either the complete content is visible at `path` or the previous file is
/// left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| BitrotError::internal(format!("No parent directory for {:?}", path)))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| BitrotError::Io(e.error))?;

    Ok(())
}

/// Format bytes in human-readable form (1024-based units)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
