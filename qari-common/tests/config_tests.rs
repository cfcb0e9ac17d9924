//! Unit tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests
//! that manipulate QARI_TEST_ROOT are marked #[serial] so they run
//! sequentially, not in parallel.

use qari_common::config::{
    default_root_folder, load_or_create_toml_config, load_toml_config, resolve_root_folder,
    write_toml_config,
};
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestConfig {
    port: u16,
    root_folder: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            port: 4010,
            root_folder: None,
        }
    }
}

#[test]
fn test_default_root_folder_is_nonempty() {
    let folder = default_root_folder();
    assert!(!folder.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_resolve_priority_cli_wins() {
    env::set_var("QARI_TEST_ROOT", "/from-env");

    let resolved = resolve_root_folder(
        Some(Path::new("/from-cli")),
        "QARI_TEST_ROOT",
        Some(Path::new("/from-toml")),
    );
    assert_eq!(resolved, PathBuf::from("/from-cli"));

    env::remove_var("QARI_TEST_ROOT");
}

#[test]
#[serial]
fn test_resolve_priority_env_beats_toml() {
    env::set_var("QARI_TEST_ROOT", "/from-env");

    let resolved = resolve_root_folder(None, "QARI_TEST_ROOT", Some(Path::new("/from-toml")));
    assert_eq!(resolved, PathBuf::from("/from-env"));

    env::remove_var("QARI_TEST_ROOT");
}

#[test]
#[serial]
fn test_resolve_falls_back_to_toml_then_default() {
    env::remove_var("QARI_TEST_ROOT");

    let resolved = resolve_root_folder(None, "QARI_TEST_ROOT", Some(Path::new("/from-toml")));
    assert_eq!(resolved, PathBuf::from("/from-toml"));

    let resolved = resolve_root_folder(None, "QARI_TEST_ROOT", None);
    assert_eq!(resolved, default_root_folder());
}

#[test]
fn test_write_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.toml");

    let config = TestConfig {
        port: 5123,
        root_folder: Some(PathBuf::from("/data/qari")),
    };
    write_toml_config(&config, &path).unwrap();

    let loaded: TestConfig = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);

    // Temp file from the atomic write is cleaned up
    assert!(!dir.path().join("test.toml.tmp").exists());
}

#[test]
fn test_load_or_create_writes_defaults_on_first_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("fresh.toml");
    assert!(!path.exists());

    let config: TestConfig = load_or_create_toml_config(&path).unwrap();
    assert_eq!(config, TestConfig::default());
    assert!(path.exists(), "defaults should be written back");

    // Second load reads the file it just wrote
    let reloaded: TestConfig = load_or_create_toml_config(&path).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_unparseable_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number").unwrap();

    let result: Result<TestConfig, _> = load_or_create_toml_config(&path);
    assert!(result.is_err(), "garbage config should not be replaced");
}
