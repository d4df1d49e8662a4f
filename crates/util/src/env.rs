//! Environment variable parsing helpers.
//!
//! Missing variables yield `None`; present but unusable values are logged and
//! also yield `None` so callers fall back to their defaults.

use std::env;

use tracing::warn;

/// Read a trimmed, non-empty string value.
pub fn string_from_environment(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Read a strictly positive integer value.
pub fn parse_u64_from_environment(key: &str) -> Option<u64> {
    let raw = string_from_environment(key)?;
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(key, value = %raw, "ignoring invalid positive integer in environment");
            None
        }
    }
}

/// Read a comma-separated list, dropping blank entries.
pub fn parse_list_from_environment(key: &str) -> Option<Vec<String>> {
    let raw = string_from_environment(key)?;
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}
