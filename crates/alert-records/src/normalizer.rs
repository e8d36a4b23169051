//! Alert Row Normalization
//!
//! Decodes JSON-encoded columns, resolves alert configuration that may live in
//! the row or in test/model meta, and fills defaults for every key a factory
//! reads.

use crate::record::{NormalizedRecord, RawRecord};
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Columns holding JSON documents, possibly still encoded as strings
const JSON_COLUMNS: [&str; 3] = ["meta", "model_meta", "test_params"];

/// String metadata defaulted to `""`
const STRING_COLUMNS: [&str; 9] = [
    "database_name",
    "schema_name",
    "table_name",
    "column_name",
    "tags",
    "test_results_description",
    "test_results_query",
    "test_sub_type",
    "test_short_name",
];

/// Alert settings resolvable from meta, with the meta keys accepted for each
const META_STRING_SETTINGS: [(&str, &[&str]); 4] = [
    ("channel", &["channel"]),
    ("owners", &["owners", "owner"]),
    ("subscribers", &["subscribers"]),
    ("description", &["description"]),
];

/// Normalize a raw alert row
///
/// Never fails: absent optional data is defaulted, and values that cannot be
/// interpreted are kept verbatim for the factory to reject.
pub fn normalize(raw: RawRecord) -> NormalizedRecord {
    let mut fields = raw;

    for column in JSON_COLUMNS {
        let decoded = decode_json_column(fields.remove(column));
        fields.insert(column.to_string(), decoded);
    }

    if !has_value(&fields, "unique_id") {
        if let Some(test_unique_id) = fields.get("test_unique_id").cloned() {
            fields.insert("unique_id".to_string(), test_unique_id);
        }
    }

    let interval = match resolve_setting(&fields, "alert_suppression_interval", &["alert_suppression_interval"]) {
        Some(value) => coerce_number(value),
        None => Value::from(0),
    };
    fields.insert("alert_suppression_interval".to_string(), interval);

    for (key, meta_keys) in META_STRING_SETTINGS {
        let value = resolve_setting(&fields, key, meta_keys)
            .map(coerce_string)
            .unwrap_or_default();
        fields.insert(key.to_string(), Value::String(value));
    }

    let disable_samples = resolve_setting(&fields, "disable_samples", &["disable_samples"])
        .map(coerce_bool)
        .unwrap_or(false);
    fields.insert("disable_samples".to_string(), Value::Bool(disable_samples));
    if disable_samples && fields.remove("test_rows_sample").is_some() {
        debug!("Dropped test rows sample for alert with samples disabled");
    }

    for column in STRING_COLUMNS {
        if !has_value(&fields, column) {
            fields.insert(column.to_string(), Value::String(String::new()));
        }
    }

    NormalizedRecord::from_fields(fields)
}

fn has_value(fields: &Map<String, Value>, key: &str) -> bool {
    !matches!(fields.get(key), None | Some(Value::Null))
}

fn decode_json_column(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::String(encoded)) => {
            if encoded.trim().is_empty() {
                return Value::Object(Map::new());
            }
            serde_json::from_str(&encoded).unwrap_or_else(|e| {
                debug!("Undecodable JSON column replaced with empty mapping: {}", e);
                Value::Object(Map::new())
            })
        }
        Some(decoded) => decoded,
    }
}

/// Top-level column first, then the row's own meta, then model meta
fn resolve_setting<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
    meta_keys: &[&str],
) -> Option<&'a Value> {
    let present = |value: &&Value| !value.is_null() && value.as_str() != Some("");

    if let Some(value) = fields.get(key).filter(present) {
        return Some(value);
    }

    ["meta", "model_meta"].iter().find_map(|container| {
        let meta = fields.get(*container)?.as_object()?;
        meta_keys.iter().find_map(|k| meta.get(*k).filter(present))
    })
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
                Value::Number(n)
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(coerce_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}
