//! Minimal `application/x-www-form-urlencoded` serialization.
//!
//! Used for rendering error responses as query strings and for building the
//! `openid-credential-offer://` deep link query parameter. Only flat
//! objects of string/number/bool values are supported — nested objects and
//! arrays are not part of this crate's wire shapes.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;

/// Serialize a value to a `key=value&key=value` query string.
///
/// # Errors
///
/// Returns an error if `value` does not serialize to a flat JSON object, or
/// a field's value is itself an object or array.
pub fn to_string(value: &impl Serialize) -> Result<String> {
    let json = serde_json::to_value(value).context("serializing to JSON")?;
    let Value::Object(map) = json else {
        return Err(anyhow!("expected a JSON object"));
    };

    let mut parts = Vec::with_capacity(map.len());
    for (key, val) in map {
        if val.is_null() {
            continue;
        }
        let rendered = match val {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Object(_) | Value::Array(_) => {
                return Err(anyhow!("field `{key}` is not a scalar value"));
            }
            Value::Null => unreachable!("filtered above"),
        };
        parts.push(format!("{key}={}", urlencoding::encode(&rendered)));
    }

    Ok(parts.join("&"))
}
