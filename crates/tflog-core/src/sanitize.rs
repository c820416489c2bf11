//! Secret redaction for arbitrary JSON trees.
//!
//! Values are redacted either because of the key they sit under
//! (`password`, `token`, `authorization`, ...) or because the string itself
//! looks like a credential: a JWT, a long hex run or a long base64 run.
//! Redacted values are replaced with [`REDACTED`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Replacement for every redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments that mark a value as secret, matched case-insensitively.
const SECRET_KEY_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "authorization",
    "x-api-key",
    "bearer",
];

/// Three dot-separated URL-safe base64 segments spanning the whole string.
static JWT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$")
        .unwrap_or_else(|_| unreachable!())
});

/// Long hex or base64 runs anywhere in the string.
static OPAQUE_SECRET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Fa-f0-9]{20,}|[A-Za-z0-9+/]{24,}={0,2}").unwrap_or_else(|_| unreachable!())
});

/// Returns true if values under `key` must be redacted wholesale.
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Returns true if the string has the shape of a credential.
#[must_use]
pub fn looks_like_secret(s: &str) -> bool {
    JWT_REGEX.is_match(s) || OPAQUE_SECRET_REGEX.is_match(s)
}

/// Recursively redacts secrets in a JSON tree.
///
/// Total over every JSON value; numbers, booleans and null pass through.
#[must_use]
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::String(s) => {
            if looks_like_secret(&s) {
                Value::String(REDACTED.to_string())
            } else {
                Value::String(s)
            }
        }
        scalar @ (Value::Number(_) | Value::Bool(_) | Value::Null) => scalar,
    }
}

/// Redacts an object, preserving key order.
#[must_use]
pub fn sanitize_object(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let value = if is_secret_key(&key) {
                Value::String(REDACTED.to_string())
            } else {
                sanitize(value)
            };
            (key, value)
        })
        .collect()
}
