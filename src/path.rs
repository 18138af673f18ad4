//! Dotted key parsing
//!
//! A key such as `a.b.c` addresses nested mappings. A backslash immediately
//! before a dot (`a\.b`) keeps the dot inside the segment.

const SEPARATOR: char = '.';
const ESCAPE: char = '\\';

/// Split a dotted key on unescaped dots.
///
/// Segments keep their escape sequences; pass each through [`strip`] before
/// using it as a property name. A key without separators yields one segment.
/// The empty key yields no segments.
pub fn split(key: &str) -> Vec<&str> {
    if key.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (idx, ch) in key.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            ESCAPE => escaped = true,
            SEPARATOR => {
                segments.push(&key[start..idx]);
                start = idx + SEPARATOR.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&key[start..]);
    segments
}

/// Remove escaping backslashes (`\.` becomes `.`) from a single segment.
///
/// A backslash that does not precede a dot is kept as-is.
pub fn strip(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ESCAPE && chars.peek() == Some(&SEPARATOR) {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Escape literal dots so the name survives [`split`] as one segment.
pub fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// Split and strip in one pass: the property names a key walks through.
pub fn segments(key: &str) -> Vec<String> {
    split(key).into_iter().map(strip).collect()
}

/// Join property names back into a dotted key, escaping as needed.
pub fn join<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| escape(name.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}
