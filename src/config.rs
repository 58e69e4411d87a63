//! Configuration: where snapshots live and which names are never scanned
//!
//! The configuration directory defaults to `~/.bitrot`. An optional
//! `config.json` inside it can replace or extend the excluded names:
//!
//! ```json
//! {
//!   "excluded_names": [".git", "node_modules"],
//!   "extra_excluded_names": ["Thumbs.db"]
//! }
//! ```
//!
//! Exclusion is by exact path component: `.git` excludes `repo/.git/HEAD`
//! but not `repo/.github/workflows/ci.yml`.

use crate::error::{BitrotError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Name of the configuration directory under the home directory
pub const CONFIG_DIR_NAME: &str = ".bitrot";

/// Subdirectory holding stored snapshots
pub const STORAGE_DIR_NAME: &str = "manifests";

/// Optional configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Names excluded when no configuration file overrides them
pub fn default_excluded_names() -> Vec<String> {
    vec![
        // macOS Finder metadata
        ".DS_Store".to_string(),
        // macOS folder icon: "Icon" followed by a carriage return
        "Icon\r".to_string(),
        // VCS folders
        ".git".to_string(),
        ".svn".to_string(),
        // Synology filesystem metadata
        "@eaDir".to_string(),
        // Our own configuration
        CONFIG_DIR_NAME.to_string(),
    ]
}

/// On-disk shape of `config.json`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    excluded_names: Option<Vec<String>>,
    extra_excluded_names: Vec<String>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Configuration directory
    pub dir: PathBuf,
    /// File and directory names never scanned
    pub excluded_names: Vec<String>,
}

impl Config {
    /// Configuration rooted at `dir` with the default exclusions
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            excluded_names: default_excluded_names(),
        }
    }

    /// Resolve `~/.bitrot`, falling back to `./.bitrot` without a home directory
    pub fn default_dir() -> Result<PathBuf> {
        let base = match dirs::home_dir() {
            Some(home) => home,
            None => std::env::current_dir().map_err(|e| {
                BitrotError::config(format!(
                    "no home directory and no working directory: {}",
                    e
                ))
            })?,
        };
        Ok(base.join(CONFIG_DIR_NAME))
    }

    /// Load the configuration stored in `dir`.
    ///
    /// A missing `config.json` yields the defaults; a malformed one is an error.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Config::new(dir);
        let file_path = config.dir.join(CONFIG_FILE_NAME);

        if file_path.exists() {
            let content = fs::read_to_string(&file_path)?;
            let file: ConfigFile = serde_json::from_str(&content)?;
            if let Some(names) = file.excluded_names {
                config.excluded_names = names;
            }
            config.excluded_names.extend(file.extra_excluded_names);
            debug!("Loaded configuration from {:?}", file_path);
        }

        Ok(config)
    }

    /// Load from the default directory
    pub fn load_default() -> Result<Self> {
        Config::load(Config::default_dir()?)
    }

    /// Add excluded names on top of the loaded ones
    pub fn with_extra_exclusions(mut self, names: impl IntoIterator<Item = String>) -> Self {
        for name in names {
            if !self.excluded_names.contains(&name) {
                self.excluded_names.push(name);
            }
        }
        self
    }

    /// Directory where snapshots are stored
    pub fn storage_dir(&self) -> PathBuf {
        self.dir.join(STORAGE_DIR_NAME)
    }

    /// Exclusion policy built from this configuration
    pub fn exclusion_policy(&self) -> ExclusionPolicy {
        ExclusionPolicy::new(self.excluded_names.clone())
    }
}

/// Decides which paths the scanner skips
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicy {
    names: Vec<String>,
}

impl ExclusionPolicy {
    /// Policy excluding the given names
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Excluded names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a single file or directory name is excluded
    pub fn is_excluded_name(&self, name: &OsStr) -> bool {
        self.names.iter().any(|excluded| OsStr::new(excluded) == name)
    }

    /// Whether any component of `path` is excluded
    pub fn is_excluded_path(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(name) => self.is_excluded_name(name),
            _ => false,
        })
    }
}
