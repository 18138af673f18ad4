//! Integration tests for the layered configuration system

use dotstore::config::{ConfigLoader, DotstoreConfig};
use dotstore::StoreError;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

fn write_global(test_dir: &TempDir, contents: &str) {
    let dir = test_dir.path().join("config").join("dotstore");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    let config = with_xdg_env(&test_dir, true, ConfigLoader::load).unwrap();
    assert_eq!(config.debounce_ms, 0);
    assert_eq!(config.indent, 2);
    assert!(config.base_dir.is_none());
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_global_file_is_loaded() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
debounce_ms = 100
namespace = "global"
"#,
    );
    let config = with_xdg_env(&test_dir, true, ConfigLoader::load).unwrap();
    assert_eq!(config.debounce_ms, 100);
    assert_eq!(config.namespace.as_deref(), Some("global"));
}

#[test]
fn test_explicit_file_overrides_global() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
debounce_ms = 100
indent = 4
"#,
    );
    let explicit = test_dir.path().join("explicit.toml");
    std::fs::write(&explicit, "indent = 0\n").unwrap();

    let config = with_xdg_env(&test_dir, true, || ConfigLoader::load_with(Some(&explicit))).unwrap();
    assert_eq!(config.debounce_ms, 100);
    assert_eq!(config.indent, 0);
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "debounce_ms = 100\n");

    let config = with_xdg_env(&test_dir, true, || {
        std::env::set_var("DOTSTORE_DEBOUNCE_MS", "7");
        std::env::set_var("DOTSTORE_LOGGING__LEVEL", "debug");
        let config = ConfigLoader::load();
        std::env::remove_var("DOTSTORE_DEBOUNCE_MS");
        std::env::remove_var("DOTSTORE_LOGGING__LEVEL");
        config
    })
    .unwrap();
    assert_eq!(config.debounce_ms, 7);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    let missing = test_dir.path().join("missing.toml");
    let result = with_xdg_env(&test_dir, true, || ConfigLoader::load_with(Some(&missing)));
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_invalid_indent_fails_validation() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "indent = 64\n");
    let result = with_xdg_env(&test_dir, true, ConfigLoader::load);
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_config_drives_store() {
    let test_dir = TempDir::new().unwrap();
    let config = DotstoreConfig {
        base_dir: Some(test_dir.path().join("stores")),
        indent: 0,
        namespace: Some("app".to_string()),
        ..DotstoreConfig::default()
    };

    let store = dotstore::Store::new(config.store_options("prefs")).unwrap();
    store.set("volume", json!(3)).unwrap();

    let expected: PathBuf = test_dir.path().join("stores").join("prefs.json");
    assert_eq!(store.path(), expected);
    assert_eq!(
        std::fs::read_to_string(&expected).unwrap(),
        r#"{"app":{"volume":3}}"#
    );
}
