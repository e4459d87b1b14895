//! Helpers for keeping identifiers and span attributes safe.
//!
//! Source ids and run names become directory names, so they must be a single
//! path component. Span fields only ever carry file names, never full paths.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Checks that `value` can be used as exactly one path component.
///
/// Returns the reason when it cannot.
pub fn check_path_component(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if value != value.trim() {
        return Err("must not have leading or trailing whitespace".to_string());
    }
    if value == "." || value == ".." {
        return Err("must not be a relative directory reference".to_string());
    }
    if value.starts_with('.') {
        return Err("must not start with '.'".to_string());
    }
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
    {
        return Err(format!("contains forbidden character {:?}", c));
    }
    Ok(())
}
