//! Forgiving decoders for collaborator-supplied JSON.
//!
//! LLM output drifts: numbers where strings were asked for, nulls, lists
//! encoded as JSON strings. Every decoder here accepts those shapes and
//! falls back to an empty value instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::TemperatureValue;

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Array values, or a JSON-encoded array inside a string.
fn array_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// String field that tolerates numbers, booleans and null (null ⇒ "").
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

/// Optional string field; null and "" both read as absent.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).filter(|s| !s.is_empty()))
}

/// Non-negative integer given as a number or a numeric string.
pub fn lenient_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// List of strings; non-scalar items are dropped.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(array_items(value).into_iter().filter_map(scalar_text).collect())
}

/// List of records; items that do not decode are skipped.
pub fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let items = array_items(value);
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if decoded.len() < total {
        tracing::warn!(
            skipped = total - decoded.len(),
            "Dropped malformed items from collaborator list"
        );
    }
    Ok(decoded)
}

/// Temperature value as number or text; anything else reads as absent.
pub fn lenient_temperature<'de, D>(deserializer: D) -> Result<Option<TemperatureValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().map(TemperatureValue::Number),
        Value::String(s) => Some(TemperatureValue::Text(s)),
        _ => None,
    })
}
