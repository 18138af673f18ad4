//! CLI route: single route table and run context. Dispatches to the store.

use crate::config::{ConfigLoader, DotstoreConfig};
use crate::store::Store;
use anyhow::Context;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::output::{format_value, parse_value};
use crate::cli::parse::{Cli, Commands};

/// Runtime context for CLI execution: loaded configuration and the open store.
pub struct RunContext {
    config: DotstoreConfig,
    store: Store,
}

impl RunContext {
    /// Load configuration and open the store selected by the CLI flags.
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = ConfigLoader::load_with(cli.config.as_deref())
            .context("Failed to load configuration")?;
        Self::with_config(config, cli.name.clone(), cli.path.clone(), cli.namespace.clone())
    }

    pub fn with_config(
        config: DotstoreConfig,
        name: String,
        path: Option<PathBuf>,
        namespace: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut options = config.store_options(name);
        if let Some(path) = path {
            options = options.path(path);
        }
        if let Some(ns) = namespace {
            options = options.namespace(ns);
        }
        let store = Store::new(options).context("Failed to open store")?;
        debug!(path = %store.path().display(), "Store opened for CLI");
        Ok(Self { config, store })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one command and return its stdout text.
    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        let output = match command {
            Commands::Get { key } => format_value(self.store.get(key)?.as_ref()),
            Commands::Set { key, value } => {
                self.store.set(key, parse_value(value))?;
                String::new()
            }
            Commands::Has { key } => self.store.has(key)?.to_string(),
            Commands::HasOwn { key } => self.store.has_own(key)?.to_string(),
            Commands::Del { key } => self.store.del(key)?.to_string(),
            Commands::Union { key, values } => {
                self.store
                    .union(key, values.iter().map(|v| parse_value(v)))?;
                format_value(self.store.get(key)?.as_ref())
            }
            Commands::Clear => {
                self.store.clear()?;
                String::new()
            }
            Commands::Json { indent } => self.store.json(*indent)?,
            Commands::Path => self.store.path().display().to_string(),
            Commands::Unlink => {
                self.store.unlink()?;
                String::new()
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .context("Failed to render configuration")?,
        };

        // The process exits right after; never leave a debounced write behind.
        self.store.flush()?;
        Ok(output)
    }
}
