//! Nested access over a JSON mapping using dotted keys.
//!
//! Traversal only descends through mappings. Sequences and scalars are
//! leaves: a path that runs into one resolves to nothing on read, and is
//! overwritten with a fresh mapping on write.
//!
//! Each operation has a `*_path` form taking already-decoded property names,
//! for callers that build paths from parts (a namespace, a literal entry
//! name) rather than from one dotted key.

use crate::path;
use serde_json::{Map, Value};

/// Resolve `key` against `root`.
///
/// A key without unescaped dots is a direct property lookup of the stripped
/// name, so `a\.b` finds a literal `"a.b"` property while `a.b` always walks
/// the path `["a", "b"]`.
pub fn get<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    get_path(root, &path::segments(key))
}

pub fn get_path<'a, S: AsRef<str>>(root: &'a Map<String, Value>, segments: &[S]) -> Option<&'a Value> {
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get(segment.as_ref())?.as_object()?;
    }
    current.get(last.as_ref())
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(root: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Value> {
    let segments = path::segments(key);
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    current.get_mut(last)
}

/// Assign `value` at `key`, creating intermediate mappings as needed.
///
/// An intermediate that exists but is not a mapping is replaced by an empty
/// mapping. The final segment is assigned directly, never merged. Returns
/// `false` only for the empty key, which addresses nothing.
pub fn set(root: &mut Map<String, Value>, key: &str, value: Value) -> bool {
    set_path(root, &path::segments(key), value)
}

pub fn set_path<S: AsRef<str>>(root: &mut Map<String, Value>, segments: &[S], value: Value) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.as_ref())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("intermediate slot was just made a mapping"),
        };
    }
    current.insert(last.as_ref().to_string(), value);
    true
}

/// True when `key` resolves to a value. Explicit `null` counts as present.
pub fn has(root: &Map<String, Value>, key: &str) -> bool {
    get(root, key).is_some()
}

/// True when every segment of `key` exists as an own property of a mapping.
pub fn has_own(root: &Map<String, Value>, key: &str) -> bool {
    has_own_path(root, &path::segments(key))
}

pub fn has_own_path<S: AsRef<str>>(root: &Map<String, Value>, segments: &[S]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        match current.get(segment.as_ref()) {
            Some(Value::Object(map)) => current = map,
            _ => return false,
        }
    }
    current.contains_key(last.as_ref())
}

/// Remove the property at `key`, returning the removed value.
///
/// `None` means nothing was deleted and the caller must not persist. A
/// literal `"foo.bar"` property is only reachable as `foo\.bar`; `foo.bar`
/// always addresses `bar` inside `foo`. Remaining siblings keep their order.
pub fn del(root: &mut Map<String, Value>, key: &str) -> Option<Value> {
    del_path(root, &path::segments(key))
}

pub fn del_path<S: AsRef<str>>(root: &mut Map<String, Value>, segments: &[S]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get_mut(segment.as_ref())?.as_object_mut()?;
    }
    current.shift_remove(last.as_ref())
}
