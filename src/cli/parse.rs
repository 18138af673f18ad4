//! CLI parse: clap types for dotstore. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dotstore - dotted-path key-value store backed by a JSON file
#[derive(Parser)]
#[command(name = "dotstore")]
#[command(about = "Dotted-path key-value store backed by a single JSON file")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store name; the file is <base_dir>/<name>.json
    #[arg(long, default_value = "dotstore")]
    pub name: String,

    /// Explicit store file (overrides --name and base_dir)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Scope every key under this top-level key
    #[arg(long)]
    pub namespace: Option<String>,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the value at KEY as JSON
    Get { key: String },
    /// Set KEY to VALUE (parsed as JSON, otherwise stored as a string)
    Set { key: String, value: String },
    /// Report whether KEY resolves to a value (null counts)
    Has { key: String },
    /// Report whether the property chain for KEY exists
    HasOwn { key: String },
    /// Delete KEY
    Del { key: String },
    /// Append VALUES to the array at KEY, skipping duplicates
    Union {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Reset the store (or namespace) to an empty object
    Clear,
    /// Print the whole document
    Json {
        /// Indent width (0 for compact)
        #[arg(long)]
        indent: Option<usize>,
    },
    /// Print the backing file path
    Path,
    /// Delete the backing file
    Unlink,
    /// Print the effective configuration as TOML
    Config,
}
