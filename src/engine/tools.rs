//! JSON path, key and header utilities

use serde_json::{Map, Value};

use crate::Record;
use crate::utils::config::HttpConsts;

/// Column name for payload items that are not JSON objects.
pub const VALUE_COLUMN: &str = "value";

/// Header names whose values are never printed.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "x-dataverse-key", "x-api-key", "cookie"];

/// Query parameters that carry credentials.
const SENSITIVE_PARAMS: &[&str] = &["api_key", "access_token", "token"];

/// Follow `path` (object keys) into `body`. An empty path returns `body` itself.
pub fn value_at_path<'a>(body: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(body, |current, key| current.get(key.as_str()))
}

/// Unwrap the records at `path`: arrays yield one record per item, a non-empty object yields
/// one record, anything else (missing, null, empty) yields none. Non-object items are stored
/// under [`VALUE_COLUMN`].
pub fn records_at(body: &Value, path: &[String]) -> Vec<Record> {
    match value_at_path(body, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::Object(map) => map.clone(),
                other => {
                    let mut record = Map::new();
                    record.insert(VALUE_COLUMN.to_string(), other.clone());
                    record
                }
            })
            .collect(),
        Some(Value::Object(map)) if !map.is_empty() => vec![map.clone()],
        _ => Vec::new(),
    }
}

/// Scalar JSON value as plain text (strings unquoted). Used to build URLs from record ids.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Remove quotes, replace spaces with underscores.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '"' && *c != '\'')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Title-case a repository name for status messages (`figshare` → `Figshare`).
pub fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn redact(pairs: &[(String, String)], sensitive: &[&str]) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .map(|(name, value)| {
            if sensitive.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                format!("{name}: <redacted>")
            } else {
                format!("{name}: {value}")
            }
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// Render headers for error messages with credential values masked.
pub fn redact_headers(headers: &[(String, String)]) -> String {
    redact(headers, SENSITIVE_HEADERS)
}

/// Render query parameters for error messages with credential values masked.
pub fn redact_params(params: &[(String, String)]) -> String {
    redact(params, SENSITIVE_PARAMS)
}

/// First [`HttpConsts::ERROR_BODY_PREVIEW`] characters of a response body.
pub fn preview(body: &str) -> String {
    let max = HttpConsts::ERROR_BODY_PREVIEW;
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
