//! Configuration System
//!
//! Layered configuration for the `dotstore` binary and for callers that want
//! file/env driven store options. Sources, lowest precedence first: built-in
//! defaults, the global config file, an explicit config file, then
//! `DOTSTORE_*` environment variables.

use crate::error::StoreError;
use crate::logging::LoggingConfig;
use crate::store::{StoreOptions, DEFAULT_INDENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;
pub mod xdg;

pub use sources::global_file::global_config_path;

/// Largest accepted indent width.
pub const MAX_INDENT: usize = 10;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotstoreConfig {
    /// Directory holding `<name>.json` files (defaults to the XDG config dir)
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Debounce window in milliseconds; 0 writes synchronously
    #[serde(default)]
    pub debounce_ms: u64,

    /// JSON indent width for the backing file
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Namespace every key is scoped under
    #[serde(default)]
    pub namespace: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_indent() -> usize {
    DEFAULT_INDENT
}

impl Default for DotstoreConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            debounce_ms: 0,
            indent: default_indent(),
            namespace: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl DotstoreConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.indent > MAX_INDENT {
            return Err(StoreError::Config(format!(
                "indent must be at most {}, got {}",
                MAX_INDENT, self.indent
            )));
        }
        if let Some(dir) = &self.base_dir {
            if dir.as_os_str().is_empty() {
                return Err(StoreError::Config("base_dir cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Store options for `name` carrying this configuration.
    pub fn store_options(&self, name: impl Into<String>) -> StoreOptions {
        let mut options = StoreOptions::new(name)
            .debounce(Duration::from_millis(self.debounce_ms))
            .indent(self.indent);
        if let Some(dir) = &self.base_dir {
            options = options.base_dir(dir);
        }
        if let Some(ns) = &self.namespace {
            options = options.namespace(ns);
        }
        options
    }
}

/// Loads [`DotstoreConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from defaults, the global file, and the environment.
    pub fn load() -> Result<DotstoreConfig, StoreError> {
        Self::load_with(None)
    }

    /// Like [`ConfigLoader::load`], with `explicit` layered above the global file.
    pub fn load_with(explicit: Option<&Path>) -> Result<DotstoreConfig, StoreError> {
        let mut builder = merge::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        builder = sources::environment::add_to_builder(builder)?;

        let config: DotstoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file with defaults, ignoring the global file and environment.
    pub fn load_from_file(path: &Path) -> Result<DotstoreConfig, StoreError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::explicit_file::add_to_builder(builder, path)?;
        let config: DotstoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
