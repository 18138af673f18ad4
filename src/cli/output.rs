//! CLI output: value rendering and error mapping to the CLI surface.

use crate::error::StoreError;
use serde_json::Value;

/// Parse a CLI argument as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a looked-up value; a missing value prints as nothing.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

/// Map errors to a string for CLI output.
pub fn map_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<StoreError>() {
        Some(StoreError::PermissionDenied { path, .. }) => format!(
            "Cannot read {}: permission denied. Check the file's owner and mode.",
            path.display()
        ),
        _ => format!("{:#}", e),
    }
}
