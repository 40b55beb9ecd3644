//! Forgiving deserializers for model-generated JSON
//!
//! Model output is untrusted: a field that should be an array may be `null`,
//! a string, or missing entirely. These helpers never fail; they coerce what
//! they can and fall back to the empty value otherwise.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Deserialize a list, yielding `[]` for anything that is not an array.
///
/// Elements that do not fit `T` are dropped individually.
pub fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(items_from_value(value))
}

/// Coerce an already-parsed value into a list of `T`.
pub fn items_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(elements) => elements
            .into_iter()
            .filter_map(|element| match serde_json::from_value(element) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Dropping malformed list element: {}", e);
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!("Expected a list, found {}; using []", kind(&other));
            Vec::new()
        }
    }
}

/// Deserialize a JSON object, yielding `{}` for anything else.
pub fn object<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => {
            warn!("Expected an object, found {}; using {{}}", kind(&other));
            Ok(Map::new())
        }
    }
}

/// Deserialize text. Scalars are stringified, `null` becomes `""`, and
/// structured values keep their JSON form.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Deserialize an optional number, accepting numeric strings such as `"7.5"`
/// or `"8/10"`.
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(&s),
        _ => None,
    })
}

/// Deserialize a flag. Accepts booleans, `0`/`1`, and yes/no words in
/// Portuguese or English.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "sim" | "yes" | "s" | "1"
        ),
        _ => false,
    })
}

fn parse_number(s: &str) -> Option<f64> {
    let head = s.trim().split('/').next()?.trim().replace(',', ".");
    head.parse().ok()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
