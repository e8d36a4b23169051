//! Alert store and delivery backend interfaces

use crate::StorageError;
use alert_records::{AlertKind, LastSentIndex, RawRecord, TableRef};
use serde_json::Value;

/// Options forwarded to the pending-alerts query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Omit sampled failing rows from test alerts
    pub disable_samples: bool,
}

/// Read side of the warehouse
pub trait AlertStore {
    /// Alerts of `kind` detected in the last `days_back` days and not yet handled
    fn fetch_pending(
        &self,
        kind: AlertKind,
        days_back: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawRecord>, StorageError>;

    /// Most recent send time per entity of `kind` in the last `days_back` days
    fn fetch_last_sent_times(
        &self,
        kind: AlertKind,
        days_back: u32,
    ) -> Result<LastSentIndex, StorageError>;
}

impl<T: AlertStore + ?Sized> AlertStore for &T {
    fn fetch_pending(
        &self,
        kind: AlertKind,
        days_back: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawRecord>, StorageError> {
        (**self).fetch_pending(kind, days_back, options)
    }

    fn fetch_last_sent_times(
        &self,
        kind: AlertKind,
        days_back: u32,
    ) -> Result<LastSentIndex, StorageError> {
        (**self).fetch_last_sent_times(kind, days_back)
    }
}

/// Write side of the warehouse
///
/// Each call is one backend round trip and must be given at most one chunk.
pub trait DeliveryBackend {
    /// Stamp `sent_at` on the given alert ids
    fn update_sent(&self, ids: &[String], sent_at: &str, table: &TableRef) -> Result<(), StorageError>;

    /// Flag the given alert ids as skipped
    fn update_skipped(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError>;
}

impl<T: DeliveryBackend + ?Sized> DeliveryBackend for &T {
    fn update_sent(&self, ids: &[String], sent_at: &str, table: &TableRef) -> Result<(), StorageError> {
        (**self).update_sent(ids, sent_at, table)
    }

    fn update_skipped(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError> {
        (**self).update_skipped(ids, table)
    }
}

/// Decode a query payload holding a JSON array of alert rows
pub fn decode_rows(payload: &str) -> Result<Vec<RawRecord>, StorageError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Object(fields) => Ok(fields),
                other => Err(StorageError::QueryError(format!(
                    "expected alert row object, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(StorageError::QueryError(format!(
            "expected array of alert rows, got {}",
            other
        ))),
    }
}

/// Decode a query payload holding a JSON object of `unique_id -> sent_at`
pub fn decode_last_sent(payload: &str) -> Result<LastSentIndex, StorageError> {
    serde_json::from_str(payload).map_err(|e| StorageError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rows() {
        let rows = decode_rows(r#"[{"id": "a"}, {"id": "b", "meta": "{}"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("meta").and_then(Value::as_str), Some("{}"));

        assert!(decode_rows("null").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rows_rejects_bad_payloads() {
        assert!(matches!(decode_rows("[1, 2]"), Err(StorageError::QueryError(_))));
        assert!(matches!(decode_rows("{\"id\": 1}"), Err(StorageError::QueryError(_))));
        assert!(matches!(decode_rows("[{"), Err(StorageError::SerializationError(_))));
    }

    #[test]
    fn test_decode_last_sent() {
        let index = decode_last_sent(r#"{"model.a": "2024-01-01 00:00:00"}"#).unwrap();
        assert_eq!(index.get("model.a"), Some("2024-01-01 00:00:00"));
        assert!(decode_last_sent("[]").is_err());
    }
}
