//! XDG base directory resolution.

use crate::error::StoreError;
use directories::BaseDirs;
use std::path::PathBuf;

/// Application directory name under the config home.
pub const APP_DIR: &str = "dotstore";

/// `$XDG_CONFIG_HOME`, or `~/.config` when unset or empty.
pub fn config_home() -> Result<PathBuf, StoreError> {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config"))
        .ok_or_else(|| StoreError::Config("Could not determine home directory".to_string()))
}

/// `<config_home>/dotstore`, home of the global config file.
pub fn app_config_dir() -> Result<PathBuf, StoreError> {
    Ok(config_home()?.join(APP_DIR))
}

/// Default directory for `<name>.json` store files.
pub fn store_dir() -> Result<PathBuf, StoreError> {
    app_config_dir()
}
