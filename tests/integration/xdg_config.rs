//! Integration tests for XDG directory resolution

use dotstore::config::{global_config_path, xdg};
use dotstore::{Store, StoreOptions};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

#[test]
fn test_config_home_respects_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, true, || {
        assert_eq!(xdg::config_home().unwrap(), test_dir.path().join("config"));
    });
}

#[test]
fn test_config_home_falls_back_to_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, false, || {
        let home = PathBuf::from(std::env::var("HOME").unwrap());
        assert_eq!(xdg::config_home().unwrap(), home.join(".config"));
    });
}

#[test]
fn test_empty_xdg_config_home_is_ignored() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, false, || {
        std::env::set_var("XDG_CONFIG_HOME", "");
        let home = PathBuf::from(std::env::var("HOME").unwrap());
        assert_eq!(xdg::config_home().unwrap(), home.join(".config"));
    });
}

#[test]
fn test_global_config_path() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, true, || {
        assert_eq!(
            global_config_path().unwrap(),
            test_dir.path().join("config").join("dotstore").join("config.toml")
        );
    });
}

#[test]
fn test_default_store_lives_in_config_dir() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, true, || {
        let store = Store::open("settings").unwrap();
        let expected = test_dir
            .path()
            .join("config")
            .join("dotstore")
            .join("settings.json");
        assert_eq!(store.path(), expected);

        // The directory is created on first write, not on open
        assert!(!expected.parent().unwrap().exists());
        store.set("theme", json!("dark")).unwrap();
        assert!(expected.exists());
    });
}

#[test]
fn test_explicit_path_ignores_xdg() {
    let test_dir = TempDir::new().unwrap();
    let explicit = test_dir.path().join("elsewhere.json");
    with_xdg_env(&test_dir, true, || {
        let store = Store::new(StoreOptions::new("ignored").path(&explicit)).unwrap();
        assert_eq!(store.path(), explicit);
        assert_eq!(store.name(), "ignored");
    });
}
