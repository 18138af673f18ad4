//! dotstore: Dotted-Path Key-Value Store
//!
//! A local key-value store backed by a single JSON document on disk. Keys are
//! dotted paths (`a.b.c`, with `\.` for a literal dot) into nested objects;
//! writes can be debounced so bursts of mutations reach disk once.
//!
//! ```no_run
//! use dotstore::{Store, StoreOptions};
//! use serde_json::json;
//!
//! let store = Store::new(StoreOptions::new("my-tool").debounce_ms(50))?;
//! store.set("window.width", json!(800))?;
//! assert_eq!(store.get("window.width")?, Some(json!(800)));
//! # Ok::<(), dotstore::StoreError>(())
//! ```

pub mod accessor;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod model;
pub mod path;
pub mod scheduler;
pub mod store;

pub use error::{Result, StoreError};
pub use model::Document;
pub use scheduler::{CoalescePolicy, ManualTimer, ThreadTimer, Timer};
pub use store::{Store, StoreOptions};
