//! In-memory Alert Repository

use crate::store::{decode_rows, AlertStore, DeliveryBackend, FetchOptions};
use crate::StorageError;
use alert_records::time::{format_timestamp, now_utc, parse_timestamp};
use alert_records::{AlertKind, LastSentIndex, RawRecord, TableRef};
use chrono::{NaiveDateTime, TimeDelta};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, info};

/// Stored alert row with its delivery state
#[derive(Debug, Clone)]
struct StoredAlert {
    record: RawRecord,
    sent_at: Option<NaiveDateTime>,
    skipped: bool,
}

impl StoredAlert {
    fn id(&self) -> Option<String> {
        match self.record.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn unique_id(&self) -> Option<&str> {
        ["unique_id", "test_unique_id"]
            .iter()
            .find_map(|key| self.record.get(*key).and_then(Value::as_str))
    }

    fn detected_at(&self) -> Option<NaiveDateTime> {
        self.record
            .get("detected_at")
            .and_then(Value::as_str)
            .and_then(|raw| parse_timestamp(raw).ok())
    }
}

/// Alert store holding rows per delivery table (in-memory implementation)
pub struct InMemoryAlertStore {
    /// Rows by table
    tables: Mutex<HashMap<TableRef, Vec<StoredAlert>>>,
    /// Table backing each kind
    kind_tables: HashMap<AlertKind, TableRef>,
    /// Fixed clock for lookback windows, wall clock when unset
    now: Option<NaiveDateTime>,
}

impl InMemoryAlertStore {
    /// Create a store using the default table of each kind
    pub fn new() -> Self {
        info!("Creating in-memory alert store");
        let kind_tables = AlertKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_table()))
            .collect();
        Self {
            tables: Mutex::new(HashMap::new()),
            kind_tables,
            now: None,
        }
    }

    /// Override the table backing a kind
    pub fn with_table(mut self, kind: AlertKind, table: TableRef) -> Self {
        self.kind_tables.insert(kind, table);
        self
    }

    /// Evaluate lookback windows against a fixed time
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Table backing a kind
    pub fn table_for(&self, kind: AlertKind) -> TableRef {
        self.kind_tables
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.default_table())
    }

    /// Insert a pending alert row
    pub fn insert(&self, kind: AlertKind, record: RawRecord) -> Result<(), StorageError> {
        self.insert_stored(kind, StoredAlert { record, sent_at: None, skipped: false })
    }

    /// Insert an alert row that was already delivered at `sent_at`
    pub fn insert_sent(
        &self,
        kind: AlertKind,
        record: RawRecord,
        sent_at: NaiveDateTime,
    ) -> Result<(), StorageError> {
        self.insert_stored(kind, StoredAlert { record, sent_at: Some(sent_at), skipped: false })
    }

    /// Insert every row of a JSON array payload as pending
    pub fn load_json(&self, kind: AlertKind, payload: &str) -> Result<usize, StorageError> {
        let rows = decode_rows(payload)?;
        let count = rows.len();
        for row in rows {
            self.insert(kind, row)?;
        }
        debug!("Loaded {} {} alert rows", count, kind);
        Ok(count)
    }

    /// Delivery time recorded for an alert
    pub fn sent_at(&self, table: &TableRef, id: &str) -> Result<Option<NaiveDateTime>, StorageError> {
        self.find(table, id, |alert| alert.sent_at).map(Option::flatten)
    }

    /// Whether an alert was marked skipped
    pub fn is_skipped(&self, table: &TableRef, id: &str) -> Result<bool, StorageError> {
        self.find(table, id, |alert| alert.skipped)
            .map(|skipped| skipped.unwrap_or(false))
    }

    /// Number of rows in a table
    pub fn alert_count(&self, table: &TableRef) -> usize {
        self.tables
            .lock()
            .map(|t| t.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.clear();
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(now_utc)
    }

    fn insert_stored(&self, kind: AlertKind, alert: StoredAlert) -> Result<(), StorageError> {
        let table = self.table_for(kind);
        let mut tables = self.lock_tables()?;
        tables.entry(table).or_default().push(alert);
        Ok(())
    }

    fn find<T>(
        &self,
        table: &TableRef,
        id: &str,
        read: impl Fn(&StoredAlert) -> T,
    ) -> Result<Option<T>, StorageError> {
        let tables = self.lock_tables()?;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|a| a.id().as_deref() == Some(id)))
            .map(read))
    }

    fn lock_tables(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<TableRef, Vec<StoredAlert>>>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    fn update_rows<F>(&self, ids: &[String], table: &TableRef, mut apply: F) -> Result<(), StorageError>
    where
        F: FnMut(&mut StoredAlert),
    {
        if !self.kind_tables.values().any(|known| known == table) {
            return Err(StorageError::WriteError {
                table: table.to_string(),
                reason: "unknown table".to_string(),
            });
        }

        let mut tables = self.lock_tables()?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        tables
            .entry(table.clone())
            .or_default()
            .iter_mut()
            .filter(|alert| alert.id().is_some_and(|id| wanted.contains(id.as_str())))
            .for_each(&mut apply);
        Ok(())
    }
}

impl Default for InMemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn fetch_pending(
        &self,
        kind: AlertKind,
        days_back: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawRecord>, StorageError> {
        let since = self.now() - TimeDelta::days(i64::from(days_back));
        let table = self.table_for(kind);
        let tables = self.lock_tables()?;

        let pending: Vec<RawRecord> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|alert| alert.sent_at.is_none() && !alert.skipped)
                    .filter(|alert| alert.detected_at().map_or(true, |at| at >= since))
                    .map(|alert| {
                        let mut record = alert.record.clone();
                        if kind == AlertKind::Test && options.disable_samples {
                            record.remove("test_rows_sample");
                        }
                        record
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(kind = %kind, count = pending.len(), "Fetched pending alerts");
        Ok(pending)
    }

    fn fetch_last_sent_times(
        &self,
        kind: AlertKind,
        days_back: u32,
    ) -> Result<LastSentIndex, StorageError> {
        let since = self.now() - TimeDelta::days(i64::from(days_back));
        let table = self.table_for(kind);
        let tables = self.lock_tables()?;

        let mut latest: HashMap<String, NaiveDateTime> = HashMap::new();
        for alert in tables.get(&table).into_iter().flatten() {
            let (Some(unique_id), Some(sent_at)) = (alert.unique_id(), alert.sent_at) else {
                continue;
            };
            if sent_at < since {
                continue;
            }
            latest
                .entry(unique_id.to_string())
                .and_modify(|current| *current = (*current).max(sent_at))
                .or_insert(sent_at);
        }

        Ok(latest
            .into_iter()
            .map(|(unique_id, sent_at)| (unique_id, format_timestamp(sent_at)))
            .collect())
    }
}

impl DeliveryBackend for InMemoryAlertStore {
    fn update_sent(&self, ids: &[String], sent_at: &str, table: &TableRef) -> Result<(), StorageError> {
        let sent_at = parse_timestamp(sent_at).map_err(|e| StorageError::WriteError {
            table: table.to_string(),
            reason: e.to_string(),
        })?;
        self.update_rows(ids, table, |alert| alert.sent_at = Some(sent_at))
    }

    fn update_skipped(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError> {
        self.update_rows(ids, table, |alert| alert.skipped = true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeliveryLedger;
    use serde_json::json;

    fn at(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    fn row(value: Value) -> RawRecord {
        match value {
            Value::Object(fields) => fields,
            _ => unreachable!(),
        }
    }

    fn store() -> InMemoryAlertStore {
        InMemoryAlertStore::new().with_now(at("2024-01-10 00:00:00"))
    }

    #[test]
    fn test_pending_excludes_handled_and_old_rows() {
        let store = store();
        store.insert(AlertKind::Model, row(json!({"id": "new", "detected_at": "2024-01-09 12:00:00"}))).unwrap();
        store.insert(AlertKind::Model, row(json!({"id": "old", "detected_at": "2023-12-01 12:00:00"}))).unwrap();
        store
            .insert_sent(AlertKind::Model, row(json!({"id": "sent", "detected_at": "2024-01-09 12:00:00"})), at("2024-01-09 13:00:00"))
            .unwrap();

        let pending = store.fetch_pending(AlertKind::Model, 7, &FetchOptions::default()).unwrap();
        let ids: Vec<_> = pending.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("new")]);
    }

    #[test]
    fn test_disable_samples_only_affects_tests() {
        let store = store();
        let sampled = json!({"id": "a", "detected_at": "2024-01-09", "test_rows_sample": [1]});
        store.insert(AlertKind::Test, row(sampled.clone())).unwrap();
        store.insert(AlertKind::Model, row(sampled)).unwrap();

        let options = FetchOptions { disable_samples: true };
        let tests = store.fetch_pending(AlertKind::Test, 7, &options).unwrap();
        let models = store.fetch_pending(AlertKind::Model, 7, &options).unwrap();
        assert!(!tests[0].contains_key("test_rows_sample"));
        assert!(models[0].contains_key("test_rows_sample"));
    }

    #[test]
    fn test_last_sent_keeps_latest_per_entity() {
        let store = store();
        for (id, sent_at) in [("a1", "2024-01-08 00:00:00"), ("a2", "2024-01-09 06:00:00")] {
            store
                .insert_sent(AlertKind::Test, row(json!({"id": id, "test_unique_id": "test.x"})), at(sent_at))
                .unwrap();
        }
        store
            .insert_sent(AlertKind::Test, row(json!({"id": "b1", "test_unique_id": "test.y"})), at("2023-11-01 00:00:00"))
            .unwrap();

        let index = store.fetch_last_sent_times(AlertKind::Test, 7).unwrap();
        assert_eq!(index.get("test.x"), Some("2024-01-09 06:00:00"));
        assert_eq!(index.get("test.y"), None);
    }

    #[test]
    fn test_ledger_writes_are_visible() {
        let store = store();
        let table = store.table_for(AlertKind::SourceFreshness);
        store
            .load_json(
                AlertKind::SourceFreshness,
                r#"[{"id": "s1", "detected_at": "2024-01-09"}, {"id": "s2", "detected_at": "2024-01-09"}]"#,
            )
            .unwrap();

        let ledger = DeliveryLedger::new(&store);
        ledger.mark_sent_at(&["s1".to_string()], &table, at("2024-01-09 10:00:00")).unwrap();
        ledger.mark_skipped(&["s2".to_string()], &table).unwrap();

        assert_eq!(store.sent_at(&table, "s1").unwrap(), Some(at("2024-01-09 10:00:00")));
        assert!(store.is_skipped(&table, "s2").unwrap());
        assert!(store
            .fetch_pending(AlertKind::SourceFreshness, 7, &FetchOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_table_write_fails() {
        let store = store();
        let err = store.update_skipped(&["x".to_string()], &TableRef::new("nope")).unwrap_err();
        assert!(matches!(err, StorageError::WriteError { .. }));
    }

    #[test]
    fn test_write_to_empty_configured_table_succeeds() {
        let store = store();
        let table = store.table_for(AlertKind::Test);
        assert_eq!(store.alert_count(&table), 0);

        store.update_sent(&["t1".to_string()], "2024-01-09 10:00:00", &table).unwrap();
        store.update_skipped(&["t2".to_string()], &table).unwrap();
        assert_eq!(store.alert_count(&table), 0);
    }

    #[test]
    fn test_custom_kind_table() {
        let store = store().with_table(AlertKind::Model, TableRef::new("model_alerts_v2"));
        store.insert(AlertKind::Model, row(json!({"id": "m"}))).unwrap();
        assert_eq!(store.alert_count(&TableRef::new("model_alerts_v2")), 1);
        assert_eq!(store.alert_count(&TableRef::new("alerts_models")), 0);
    }
}
