//! In-memory document with lazy materialisation from the backing file.

use crate::error::{Result, StoreError};
use crate::fs::Filesystem;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type Document = Map<String, Value>;

/// Owns the cached root document for one backing file.
///
/// Nothing is read from disk until the document is first needed. Defaults
/// seed missing top-level keys exactly once, at that first materialisation.
#[derive(Debug)]
pub struct DataModel {
    path: PathBuf,
    defaults: Document,
    document: Option<Document>,
}

impl DataModel {
    pub fn new(path: impl Into<PathBuf>, defaults: Document) -> Self {
        Self {
            path: path.into(),
            defaults,
            document: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Read and parse the backing file without touching the cache.
    pub fn load(&self, fs: &dyn Filesystem) -> Result<Document> {
        load_document(fs, &self.path)
    }

    /// Return the cached document, loading it and merging defaults on first use.
    pub fn load_or_get_document(&mut self, fs: &dyn Filesystem) -> Result<&mut Document> {
        if self.document.is_none() {
            let mut loaded = self.load(fs)?;
            for (key, value) in &self.defaults {
                if !loaded.contains_key(key) {
                    loaded.insert(key.clone(), value.clone());
                }
            }
            self.document = Some(loaded);
        }
        Ok(self.document.get_or_insert_with(Document::new))
    }

    /// Replace the cached document wholesale. Defaults are not re-applied.
    pub fn replace_document(&mut self, document: Document) {
        self.document = Some(document);
    }
}

/// Load a document from `path`.
///
/// Missing, unreadable-for-other-reasons, and unparseable files all yield an
/// empty document. Only a permission failure is reported.
pub fn load_document(fs: &dyn Filesystem, path: &Path) -> Result<Document> {
    let contents = match fs.read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No backing file, starting empty");
            return Ok(Document::new());
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(StoreError::PermissionDenied {
                path: path.to_path_buf(),
                source: e,
            });
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read backing file, starting empty");
            return Ok(Document::new());
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => {
            debug!(path = %path.display(), keys = map.len(), "Loaded document");
            Ok(map)
        }
        Ok(_) => {
            warn!(path = %path.display(), "Backing file is not a JSON object, starting empty");
            Ok(Document::new())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Backing file is not valid JSON, starting empty");
            Ok(Document::new())
        }
    }
}
