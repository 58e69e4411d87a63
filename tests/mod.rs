//! Main test module for bitrot
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end scenarios
//! - Property-based tests for comparator invariants
//! - Edge cases around the scanner and the store

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::bitrot::*;
    use std::fs;
    use tempfile::TempDir;

    fn bitrot_for(config_dir: &TempDir) -> Bitrot {
        BitrotBuilder::new()
            .config(Config::new(config_dir.path()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_relative_and_absolute_roots_share_history() -> anyhow::Result<()> {
        let config_dir = TempDir::new()?;
        let data_dir = TempDir::new()?;
        let bitrot = bitrot_for(&config_dir);
        fs::create_dir_all(data_dir.path().join("inner"))?;
        fs::write(data_dir.path().join("inner/a.txt"), "a")?;

        bitrot.check(data_dir.path().join("inner"))?;

        let dotted = data_dir.path().join("inner").join("..").join("inner");
        let report = bitrot.check(&dotted)?;
        assert!(!report.is_first_run());
        Ok(())
    }

    #[test]
    fn test_config_file_exclusions_apply() -> anyhow::Result<()> {
        let config_dir = TempDir::new()?;
        let data_dir = TempDir::new()?;
        fs::write(
            config_dir.path().join("config.json"),
            r#"{"extra_excluded_names": ["cache"]}"#,
        )?;

        fs::create_dir_all(data_dir.path().join("cache"))?;
        fs::write(data_dir.path().join("cache/blob"), "tmp")?;
        fs::write(data_dir.path().join("keep"), "keep")?;

        let config = Config::load(config_dir.path())?;
        assert!(config.exclusion_policy().names().contains(&"cache".to_string()));

        let bitrot = BitrotBuilder::new().config(config).build()?;
        let report = bitrot.check(data_dir.path())?;

        assert_eq!(report.snapshot.paths().collect::<Vec<_>>(), vec!["keep"]);
        Ok(())
    }

    #[test]
    fn test_corrupt_store_file_fails_check() {
        let config_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        let bitrot = bitrot_for(&config_dir);
        fs::write(data_dir.path().join("a"), "a").unwrap();

        let saved = bitrot.check(data_dir.path()).unwrap().saved_to.unwrap();
        fs::write(&saved, "not json").unwrap();

        match bitrot.check(data_dir.path()) {
            Err(BitrotError::SnapshotCorrupt { path, .. }) => assert_eq!(path, saved),
            other => panic!("expected SnapshotCorrupt, got {:?}", other.map(|r| r.success())),
        }
    }

    #[test]
    fn test_large_tree_uses_parallel_path() {
        let config_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        let bitrot = bitrot_for(&config_dir);

        let file_count = comparison::PARALLEL_THRESHOLD + 10;
        for i in 0..file_count {
            let dir = data_dir.path().join(format!("d{}", i % 32));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("f{}", i)), i.to_string()).unwrap();
        }

        bitrot.check(data_dir.path()).unwrap();
        let report = bitrot.check(data_dir.path()).unwrap();
        let comparison = report.comparison.unwrap();

        assert_eq!(comparison.unchanged_paths().len(), file_count);
        assert!(comparison.success());
    }
}
