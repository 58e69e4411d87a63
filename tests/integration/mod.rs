//! End-to-end integration tests for bitrot
//!
//! A harness builds a project tree on disk, applies a seeded mix of edits,
//! silent corruptions, renames, deletions and additions, and checks that a
//! second run classifies every path exactly as expected.

use ::bitrot::*;
use filetime::FileTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness owning a data directory, a config directory and a checker
pub struct BitrotTestHarness {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
    pub bitrot: Bitrot,
    pub files: Vec<String>,
    rng: StdRng,
    counter: usize,
}

/// What the harness did, and therefore what a check must report
#[derive(Debug, Default)]
pub struct Expected {
    pub modified: BTreeSet<String>,
    pub flagged: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub renamed: BTreeSet<RenamedPair>,
}

impl BitrotTestHarness {
    pub fn new(seed: u64) -> Self {
        let data_dir = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        let bitrot = BitrotBuilder::new()
            .config(Config::new(config_dir.path()))
            .parallel_workers(4)
            .build()
            .unwrap();

        Self {
            data_dir,
            config_dir,
            bitrot,
            files: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            counter: 0,
        }
    }

    pub fn root(&self) -> &Path {
        self.data_dir.path()
    }

    fn abs(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Content that is unique to this harness run
    fn unique_content(&mut self) -> Vec<u8> {
        self.counter += 1;
        let len = self.rng.random_range(16..512);
        let mut content = format!("file #{}\n", self.counter).into_bytes();
        content.extend((0..len).map(|_| self.rng.random::<u8>()));
        content
    }

    /// Create `dirs` directories with `files_per_dir` files each
    pub fn generate_project(&mut self, dirs: usize, files_per_dir: usize) -> anyhow::Result<()> {
        for d in 0..dirs {
            fs::create_dir_all(self.abs(&format!("dir_{}", d)))?;
            for f in 0..files_per_dir {
                let rel = format!("dir_{}/file_{}.bin", d, f);
                let content = self.unique_content();
                fs::write(self.abs(&rel), content)?;
                self.files.push(rel);
            }
        }
        Ok(())
    }

    fn take_random_file(&mut self) -> String {
        let idx = self.rng.random_range(0..self.files.len());
        self.files.swap_remove(idx)
    }

    /// Rewrite a file and move its mtime forward
    pub fn edit(&mut self, expected: &mut Expected) {
        let rel = self.take_random_file();
        let content = self.unique_content();
        let path = self.abs(&rel);
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
        fs::write(&path, content).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime.unix_seconds() + 3600, 0)).unwrap();
        expected.modified.insert(rel);
    }

    /// Flip one byte and put the old mtime back
    pub fn corrupt(&mut self, expected: &mut Expected) {
        let rel = self.take_random_file();
        let path = self.abs(&rel);
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
        let mut content = fs::read(&path).unwrap();
        let idx = self.rng.random_range(0..content.len());
        content[idx] ^= 0xFF;
        fs::write(&path, content).unwrap();
        filetime::set_file_mtime(&path, mtime).unwrap();
        expected.flagged.insert(rel);
    }

    pub fn rename(&mut self, expected: &mut Expected) {
        let rel = self.take_random_file();
        let new_rel = format!("moved/{}", rel.replace('/', "_"));
        fs::create_dir_all(self.abs("moved")).unwrap();
        fs::rename(self.abs(&rel), self.abs(&new_rel)).unwrap();
        expected.renamed.insert(RenamedPair::new(rel, new_rel));
    }

    pub fn delete(&mut self, expected: &mut Expected) {
        let rel = self.take_random_file();
        fs::remove_file(self.abs(&rel)).unwrap();
        expected.deleted.insert(rel);
    }

    pub fn add(&mut self, expected: &mut Expected) {
        self.counter += 1;
        let rel = format!("new_{}.bin", self.counter);
        let content = self.unique_content();
        fs::write(self.abs(&rel), content).unwrap();
        expected.added.insert(rel);
    }
}

#[test]
fn test_seeded_mutation_mix_is_classified_exactly() -> anyhow::Result<()> {
    for seed in [1u64, 7, 42] {
        let mut harness = BitrotTestHarness::new(seed);
        harness.generate_project(5, 20)?;
        let total_files = harness.files.len();

        let first = harness.bitrot.check(harness.root())?;
        assert!(first.is_first_run());
        assert_eq!(first.snapshot.len(), total_files);

        let mut expected = Expected::default();
        for _ in 0..5 {
            harness.edit(&mut expected);
            harness.corrupt(&mut expected);
            harness.rename(&mut expected);
            harness.delete(&mut expected);
            harness.add(&mut expected);
        }
        let untouched: BTreeSet<String> = harness.files.iter().cloned().collect();

        let report = harness.bitrot.check(harness.root())?;
        let comparison = report.comparison.as_ref().unwrap();

        assert_eq!(comparison.unchanged_paths(), &untouched, "seed {}", seed);
        assert_eq!(comparison.modified_paths(), &expected.modified, "seed {}", seed);
        assert_eq!(comparison.flagged_paths(), &expected.flagged, "seed {}", seed);
        assert_eq!(comparison.added_paths(), &expected.added, "seed {}", seed);
        assert_eq!(comparison.deleted_paths(), &expected.deleted, "seed {}", seed);
        assert_eq!(comparison.renamed_paths(), &expected.renamed, "seed {}", seed);
        assert!(comparison.ambiguous_hashes().is_empty());

        // Every original file counted once, plus the additions
        assert_eq!(comparison.total_checked(), total_files + expected.added.len());
        assert!(!report.success());
    }
    Ok(())
}

#[test]
fn test_duplicate_content_renames_pair_by_name_order() {
    let harness = BitrotTestHarness::new(0);
    let root = harness.root();
    for name in ["a1.txt", "a2.txt"] {
        fs::write(root.join(name), "same bytes").unwrap();
    }
    harness.bitrot.check(root).unwrap();

    fs::rename(root.join("a1.txt"), root.join("b2.txt")).unwrap();
    fs::rename(root.join("a2.txt"), root.join("b1.txt")).unwrap();

    let report = harness.bitrot.check(root).unwrap();
    let comparison = report.comparison.unwrap();

    let pairs: Vec<_> = comparison.renamed_paths().iter().cloned().collect();
    assert_eq!(
        pairs,
        vec![RenamedPair::new("a1.txt", "b1.txt"), RenamedPair::new("a2.txt", "b2.txt")]
    );
    assert_eq!(comparison.ambiguous_hashes().len(), 1);
    assert!(comparison.success());
}

#[test]
fn test_empty_directory_round_trip() {
    let harness = BitrotTestHarness::new(0);

    let first = harness.bitrot.check(harness.root()).unwrap();
    assert!(first.snapshot.is_empty());

    // An empty previous snapshot is still a previous snapshot
    fs::write(harness.root().join("late.txt"), "hi").unwrap();
    let second = harness.bitrot.check(harness.root()).unwrap();
    let comparison = second.comparison.unwrap();
    assert!(comparison.added_paths().contains("late.txt"));
}

#[test]
fn test_unicode_and_special_names() {
    let harness = BitrotTestHarness::new(0);
    let names = [
        "file with spaces.txt",
        "файл.txt",
        "文件.txt",
        "🚀🌟💾.txt",
        "file(with)parens.txt",
    ];

    let mut created = Vec::new();
    for name in names {
        if fs::write(harness.root().join(name), format!("content of {}", name)).is_ok() {
            created.push(name);
        }
    }

    harness.bitrot.check(harness.root()).unwrap();
    let report = harness.bitrot.check(harness.root()).unwrap();
    let comparison = report.comparison.unwrap();

    for name in created {
        assert!(comparison.unchanged_paths().contains(name), "missing {}", name);
    }
}

#[test]
fn test_history_accumulates_per_root() {
    let harness = BitrotTestHarness::new(0);
    fs::write(harness.root().join("a"), "a").unwrap();

    for _ in 0..3 {
        harness.bitrot.check(harness.root()).unwrap();
    }

    let history = harness.bitrot.history(harness.root()).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|s| s.file_count == 1));
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    // A config dir reused across roots keeps the histories apart
    let other = TempDir::new().unwrap();
    assert!(harness.bitrot.history(other.path()).unwrap().is_empty());
    assert!(harness.config_dir.path().join("manifests").join("metadata.json").exists());
}
