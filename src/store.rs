//! Store
//!
//! Public façade over the cached document, the dotted-path accessor, and the
//! write scheduler. Mutating operations change the in-memory document and
//! then request a save; read operations never write.

use crate::accessor;
use crate::error::{Result, StoreError};
use crate::fs::{Filesystem, OsFilesystem};
use crate::model::{DataModel, Document};
use crate::path;
use crate::scheduler::{
    CoalescePolicy, SaveAction, ThreadTimer, Timer, TimerTask, WriteScheduler,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info};

/// Default JSON indent width for the backing file.
pub const DEFAULT_INDENT: usize = 2;

/// Callback for failures of deferred writes, which have no caller to return to.
pub type WriteErrorHook = Arc<dyn Fn(&StoreError) + Send + Sync>;

/// Construction options for a [`Store`].
#[derive(Clone)]
pub struct StoreOptions {
    /// Store identifier; names the file `<name>.json` when no explicit path is given.
    pub name: String,
    /// Explicit backing file; overrides `name` and `base_dir`.
    pub path: Option<PathBuf>,
    /// Directory for `<name>.json`; defaults to the XDG config directory.
    pub base_dir: Option<PathBuf>,
    /// Quiet period before a deferred write. Zero writes synchronously.
    pub debounce: Duration,
    pub coalesce: CoalescePolicy,
    /// Spaces per indent level; zero writes compact JSON.
    pub indent: usize,
    /// Top-level key every operation is scoped under.
    pub namespace: Option<String>,
    /// Seeds missing top-level keys on first load only.
    pub defaults: Document,
    pub filesystem: Arc<dyn Filesystem>,
    /// Timer driving deferred writes; a [`ThreadTimer`] is created when needed.
    pub timer: Option<Arc<dyn Timer>>,
    pub on_write_error: Option<WriteErrorHook>,
}

impl StoreOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            base_dir: None,
            debounce: Duration::ZERO,
            coalesce: CoalescePolicy::default(),
            indent: DEFAULT_INDENT,
            namespace: None,
            defaults: Document::new(),
            filesystem: Arc::new(OsFilesystem::new()),
            timer: None,
            on_write_error: None,
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn debounce_ms(self, millis: u64) -> Self {
        self.debounce(Duration::from_millis(millis))
    }

    pub fn coalesce(mut self, policy: CoalescePolicy) -> Self {
        self.coalesce = policy;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn defaults(mut self, defaults: Document) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.filesystem = filesystem;
        self
    }

    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn on_write_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StoreError) + Send + Sync + 'static,
    {
        self.on_write_error = Some(Arc::new(hook));
        self
    }

    /// Resolve the backing file path.
    ///
    /// Explicit `path` wins; otherwise `<base_dir>/<name>.json`, with
    /// `base_dir` falling back to `$XDG_CONFIG_HOME/dotstore`.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidArgument(
                "store name must be a non-empty string".to_string(),
            ));
        }
        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => crate::config::xdg::store_dir()?,
        };
        Ok(base_dir.join(format!("{}.json", name)))
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("base_dir", &self.base_dir)
            .field("debounce", &self.debounce)
            .field("coalesce", &self.coalesce)
            .field("indent", &self.indent)
            .field("namespace", &self.namespace)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

struct StoreInner {
    model: DataModel,
    scheduler: WriteScheduler,
    fs: Arc<dyn Filesystem>,
    indent: usize,
}

impl StoreInner {
    fn document(&mut self) -> Result<&mut Document> {
        let fs = Arc::clone(&self.fs);
        self.model.load_or_get_document(fs.as_ref())
    }

    /// Write the current document now and return the scheduler to `Idle`.
    fn write_file(&mut self) -> Result<()> {
        self.scheduler.cancel();
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        let indent = self.indent;
        let path = self.model.path().to_path_buf();
        let contents = to_json_string(self.document()?, indent)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs.create_dir_all(parent)
                .map_err(|e| StoreError::write(parent, e))?;
        }
        fs.write_atomic(&path, contents.as_bytes())
            .map_err(|e| StoreError::write(&path, e))?;

        debug!(path = %path.display(), bytes = contents.len(), "Wrote document");
        Ok(())
    }
}

/// A dotted-path key-value store persisted as one JSON file.
///
/// Operations take `&self`; the document lives behind a lock shared with the
/// deferred-write task. A write still pending when the store is dropped is
/// flushed during drop.
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
    name: String,
    path: PathBuf,
    namespace: Option<String>,
    indent: usize,
    on_write_error: Option<WriteErrorHook>,
}

impl Store {
    /// Open a store named `name` under the default config directory.
    pub fn open(name: impl Into<String>) -> Result<Self> {
        Self::new(StoreOptions::new(name))
    }

    pub fn new(options: StoreOptions) -> Result<Self> {
        let path = options.resolve_path()?;
        let name = match options.name.trim() {
            "" => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name => name.to_string(),
        };
        let namespace = options.namespace.filter(|ns| !ns.is_empty());

        let timer = match options.timer {
            Some(timer) => Some(timer),
            None if !options.debounce.is_zero() => {
                Some(Arc::new(ThreadTimer::new()) as Arc<dyn Timer>)
            }
            None => None,
        };

        debug!(
            name = %name,
            path = %path.display(),
            debounce_ms = options.debounce.as_millis() as u64,
            "Opened store"
        );

        let inner = StoreInner {
            model: DataModel::new(&path, options.defaults),
            scheduler: WriteScheduler::new(options.debounce, options.coalesce, timer),
            fs: options.filesystem,
            indent: options.indent,
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            name,
            path,
            namespace,
            indent: options.indent,
            on_write_error: options.on_write_error,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_write_pending(&self) -> bool {
        self.inner.lock().scheduler.is_pending()
    }

    /// Property names addressed by `key`, under the namespace if one is set.
    /// `None` for the empty key.
    fn key_path(&self, key: &str) -> Option<Vec<String>> {
        if key.is_empty() {
            return None;
        }
        Some(self.scoped(path::segments(key)))
    }

    /// Prefix `names` with the namespace. The namespace is always one
    /// property, whatever characters it contains.
    fn scoped(&self, names: Vec<String>) -> Vec<String> {
        match &self.namespace {
            Some(ns) => std::iter::once(ns.clone()).chain(names).collect(),
            None => names,
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let Some(key) = self.key_path(key) else {
            return Ok(None);
        };
        let mut inner = self.inner.lock();
        Ok(accessor::get_path(inner.document()?, &key).cloned())
    }

    /// Read `key` and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// True when `key` resolves to a value, including `null`.
    pub fn has(&self, key: &str) -> Result<bool> {
        let Some(key) = self.key_path(key) else {
            return Ok(false);
        };
        let mut inner = self.inner.lock();
        Ok(accessor::get_path(inner.document()?, &key).is_some())
    }

    /// True when the full property chain for `key` exists.
    pub fn has_own(&self, key: &str) -> Result<bool> {
        let Some(key) = self.key_path(key) else {
            return Ok(false);
        };
        let mut inner = self.inner.lock();
        Ok(accessor::has_own_path(inner.document()?, &key))
    }

    /// Assign `value` at `key`. Passing `None` deletes the key instead.
    pub fn set(&self, key: &str, value: impl Into<Option<Value>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.del(key).map(|_| ());
        };
        let Some(key) = self.key_path(key) else {
            return Ok(());
        };
        let mut inner = self.inner.lock();
        accessor::set_path(inner.document()?, &key, value);
        self.request_save(&mut inner)
    }

    /// Serialize `value` and assign it at `key`.
    pub fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?)
    }

    /// Assign every entry of `entries`, treating each name as a literal key.
    ///
    /// Names are never decoded, so `{"a.b": 1}` creates a top-level `"a.b"`
    /// property rather than a nested one, and backslashes are kept as written.
    pub fn set_entries(&self, entries: &Document) -> Result<()> {
        self.set_batch(std::slice::from_ref(entries))
    }

    /// Apply several entry mappings in order; later ones win on overlap.
    pub fn set_batch(&self, batch: &[Document]) -> Result<()> {
        let mut inner = self.inner.lock();
        let mut changed = false;
        {
            let document = inner.document()?;
            for entries in batch {
                for (name, value) in entries {
                    if name.is_empty() {
                        continue;
                    }
                    let key = self.scoped(vec![name.clone()]);
                    changed |= accessor::set_path(document, &key, value.clone());
                }
            }
        }
        if changed {
            self.request_save(&mut inner)?;
        }
        Ok(())
    }

    /// Dynamic form of `set` for keys that arrive as JSON.
    ///
    /// `target` may be a string key, a mapping of entries, or a sequence of
    /// mappings. For the latter two `value` is ignored.
    pub fn assign(&self, target: &Value, value: Option<Value>) -> Result<()> {
        match target {
            Value::String(key) => self.set(key, value),
            Value::Object(entries) => self.set_entries(entries),
            Value::Array(items) => {
                let batch = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(entries) => Ok(entries.clone()),
                        other => Err(StoreError::InvalidArgument(format!(
                            "expected a mapping in key sequence, got {}",
                            kind_of(other)
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.set_batch(&batch)
            }
            other => Err(StoreError::InvalidArgument(format!(
                "key must be a string, mapping, or sequence of mappings, got {}",
                kind_of(other)
            ))),
        }
    }

    /// Delete `key`. Returns false, without writing, when nothing was there.
    pub fn del(&self, key: &str) -> Result<bool> {
        let Some(key) = self.key_path(key) else {
            return Ok(false);
        };
        let mut inner = self.inner.lock();
        if accessor::del_path(inner.document()?, &key).is_none() {
            return Ok(false);
        }
        self.request_save(&mut inner)?;
        Ok(true)
    }

    /// Append `values` to the sequence at `key`, dropping duplicates.
    ///
    /// A missing, `null`, or empty-string value starts from an empty
    /// sequence; any other non-sequence value becomes its first element.
    /// Sequence arguments are flattened one level. First occurrences win.
    pub fn union<I>(&self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let Some(key) = self.key_path(key) else {
            return Ok(());
        };
        let mut inner = self.inner.lock();
        {
            let document = inner.document()?;
            let existing = accessor::get_path(document, &key).cloned();
            let merged = union_values(existing, values);
            accessor::set_path(document, &key, Value::Array(merged));
        }
        self.request_save(&mut inner)
    }

    /// Deep copy of the document, or of the namespaced sub-document.
    pub fn clone_document(&self) -> Result<Value> {
        let mut inner = self.inner.lock();
        let document = inner.document()?;
        Ok(match &self.namespace {
            Some(ns) => accessor::get_path(document, &[ns])
                .cloned()
                .unwrap_or_else(|| Value::Object(Document::new())),
            None => Value::Object(document.clone()),
        })
    }

    /// Reset the document (or the namespaced sub-document) to empty.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match &self.namespace {
            Some(ns) => {
                accessor::set_path(inner.document()?, &[ns], Value::Object(Document::new()));
            }
            None => inner.model.replace_document(Document::new()),
        }
        self.request_save(&mut inner)
    }

    /// Serialize the full document. `indent` overrides the configured width.
    pub fn json(&self, indent: Option<usize>) -> Result<String> {
        let mut inner = self.inner.lock();
        let indent = indent.unwrap_or(self.indent);
        to_json_string(inner.document()?, indent)
    }

    /// Copy of the full document, namespace or not.
    pub fn document(&self) -> Result<Document> {
        let mut inner = self.inner.lock();
        Ok(inner.document()?.clone())
    }

    /// Run `f` against the live document without scheduling a write.
    ///
    /// Changes made here reach disk with the next save.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Result<R> {
        let mut inner = self.inner.lock();
        Ok(f(inner.document()?))
    }

    /// Replace the whole document and save.
    pub fn replace_document(&self, document: Document) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.model.replace_document(document);
        self.request_save(&mut inner)
    }

    /// Re-read the backing file. The cached document is left untouched.
    pub fn load(&self) -> Result<Document> {
        let inner = self.inner.lock();
        inner.model.load(inner.fs.as_ref())
    }

    /// Request a write, deferred when debouncing is enabled.
    pub fn save(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.request_save(&mut inner)
    }

    /// Write synchronously now, cancelling any pending deferred write.
    pub fn write_file(&self) -> Result<()> {
        self.inner.lock().write_file()
    }

    /// Perform a pending deferred write immediately. Returns whether one was pending.
    pub fn flush(&self) -> Result<bool> {
        let mut inner = self.inner.lock();
        if !inner.scheduler.is_pending() {
            return Ok(false);
        }
        inner.write_file()?;
        Ok(true)
    }

    /// Cancel any pending write and delete the backing file.
    ///
    /// The in-memory document is kept; a later mutation recreates the file.
    pub fn unlink(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.scheduler.cancel();
        inner
            .fs
            .remove_file(&self.path)
            .map_err(|e| StoreError::write(&self.path, e))?;
        info!(path = %self.path.display(), "Removed store file");
        Ok(())
    }

    fn request_save(&self, inner: &mut StoreInner) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        let hook = self.on_write_error.clone();
        let action = inner.scheduler.save(|generation| -> TimerTask {
            Box::new(move || run_deferred_write(&weak, generation, hook.as_ref()))
        });
        match action {
            SaveAction::WriteNow => inner.write_file(),
            SaveAction::Scheduled => Ok(()),
        }
    }
}

fn run_deferred_write(
    inner: &Weak<Mutex<StoreInner>>,
    generation: u64,
    hook: Option<&WriteErrorHook>,
) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let result = {
        let mut guard = inner.lock();
        if !guard.scheduler.complete(generation) {
            return;
        }
        guard.persist()
    };
    if let Err(e) = result {
        error!(error = %e, "Deferred write failed");
        if let Some(hook) = hook {
            hook(&e);
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.scheduler.cancel() {
            if let Err(e) = inner.persist() {
                error!(path = %self.path.display(), error = %e, "Failed to flush pending write on drop");
            }
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

fn union_values<I>(existing: Option<Value>, values: I) -> Vec<Value>
where
    I: IntoIterator<Item = Value>,
{
    let mut items = match existing {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    };
    for value in values {
        match value {
            Value::Array(nested) => items.extend(nested),
            other => items.push(other),
        }
    }

    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Serialize with `indent` spaces per level, or compactly when zero.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let spaces = vec![b' '; indent];
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&spaces));
    value.serialize(&mut serializer)?;
    String::from_utf8(buf)
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
