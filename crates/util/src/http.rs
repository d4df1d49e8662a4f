//! # HTTP Utilities
//!
//! Helpers for turning provider response bodies into JSON while keeping
//! enough context around to diagnose a misbehaving provider.

use serde_json::Value;
use thiserror::Error;

/// Maximum number of body characters kept in error previews.
const BODY_PREVIEW_LIMIT: usize = 200;

/// Parse a provider response body, treating a blank body as `Value::Null`.
///
/// Some providers answer "not found" with an empty body and a 4xx status;
/// that is left for the provider transform to interpret.
///
/// # Example
/// ```rust
/// use cep_util::http::parse_response_body;
/// use serde_json::Value;
///
/// assert_eq!(parse_response_body("  ", Some(404)).unwrap(), Value::Null);
/// assert!(parse_response_body(r#"{"cep": "01001000"}"#, Some(200)).unwrap().is_object());
/// ```
pub fn parse_response_body(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    parse_response_json_strict(text, status)
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// Any parsing error is decorated with the originating HTTP status code plus a
/// truncated preview of the response body. Use this when a JSON response is
/// required and the caller should surface failures instead of silently
/// degrading to `null`.
///
/// # Errors
/// Returns a [`JsonParseError`] describing the parse failure. The message
/// includes the original serde error and up to 200 characters of the response
/// body (with whitespace collapsed).
pub fn parse_response_json_strict(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, BODY_PREVIEW_LIMIT);

        JsonParseError::new(status_note, error, preview)
    })
}

fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}
