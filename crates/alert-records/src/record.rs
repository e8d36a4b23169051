//! Raw and normalized alert rows

use crate::error::RecordError;
use crate::time::parse_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Loosely-typed alert row as returned by the query layer
pub type RawRecord = Map<String, Value>;

/// Alert row with every factory-required key materialized
///
/// Only produced by [`crate::normalize`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: Map<String, Value>,
}

impl NormalizedRecord {
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a field if it holds a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether the key is present (possibly null)
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Occurrence id, stringified when the query layer returned a number
    pub fn id(&self) -> Option<String> {
        match self.fields.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Monitored entity id, if non-empty
    pub fn unique_id(&self) -> Option<&str> {
        self.get_str("unique_id").filter(|s| !s.is_empty())
    }

    /// Suppression interval in hours, if numeric
    pub fn alert_suppression_interval(&self) -> Option<f64> {
        match self.fields.get("alert_suppression_interval")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Most recent notification time per `unique_id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LastSentIndex(HashMap<String, String>);

impl LastSentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send time for an entity, replacing any previous value
    pub fn insert(&mut self, unique_id: impl Into<String>, sent_at: impl Into<String>) {
        self.0.insert(unique_id.into(), sent_at.into());
    }

    /// Raw timestamp string for an entity
    pub fn get(&self, unique_id: &str) -> Option<&str> {
        self.0.get(unique_id).map(String::as_str)
    }

    /// Parsed send time for an entity
    ///
    /// Absent entities and empty values are reported as never notified.
    pub fn last_sent_at(&self, unique_id: &str) -> Result<Option<NaiveDateTime>, RecordError> {
        match self.get(unique_id) {
            Some(raw) if !raw.trim().is_empty() => parse_timestamp(raw).map(Some),
            _ => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for LastSentIndex {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LastSentIndex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
