//! Alert factories
//!
//! One factory per kind. Factories are pure: a row either becomes a typed
//! alert or a [`ConstructionError`] describing the first problem found.

use crate::alert::{Alert, ModelAlert, SourceFreshnessAlert, TestAlert, TestType};
use crate::config::AlertContext;
use crate::error::ConstructionError;
use alert_records::time::parse_timestamp;
use alert_records::{AlertKind, NormalizedRecord};
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Construction of a typed alert from a normalized row
pub trait AlertFactory: Sized + Into<Alert> {
    /// Kind of alert this factory builds
    const KIND: AlertKind;

    fn build(record: &NormalizedRecord, context: &AlertContext) -> Result<Self, ConstructionError>;
}

/// Build an alert with the factory for `kind`
pub fn build_alert(
    kind: AlertKind,
    record: &NormalizedRecord,
    context: &AlertContext,
) -> Result<Alert, ConstructionError> {
    match kind {
        AlertKind::Test => TestAlert::build(record, context).map(Alert::from),
        AlertKind::Model => ModelAlert::build(record, context).map(Alert::from),
        AlertKind::SourceFreshness => SourceFreshnessAlert::build(record, context).map(Alert::from),
    }
}

impl AlertFactory for TestAlert {
    const KIND: AlertKind = AlertKind::Test;

    fn build(record: &NormalizedRecord, context: &AlertContext) -> Result<Self, ConstructionError> {
        let fields = Fields(record);
        let test_type: TestType = fields.required_str("test_type")?.parse()?;
        let test_sub_type = fields.string_or_default("test_sub_type")?;
        if test_type.requires_sub_type() && test_sub_type.is_empty() {
            return Err(ConstructionError::MissingField("test_sub_type"));
        }

        Ok(TestAlert {
            id: fields.id()?,
            unique_id: fields.required_str("unique_id")?,
            model_unique_id: fields.optional_str("model_unique_id")?,
            test_type,
            test_sub_type,
            test_name: fields.required_str("test_name")?,
            test_short_name: fields.string_or_default("test_short_name")?,
            test_params: fields.object("test_params")?,
            test_results_description: fields.string_or_default("test_results_description")?,
            test_results_query: fields.string_or_default("test_results_query")?,
            test_rows_sample: record.get("test_rows_sample").filter(|v| !v.is_null()).cloned(),
            database_name: fields.string_or_default("database_name")?,
            schema_name: fields.required_str("schema_name")?,
            table_name: fields.string_or_default("table_name")?,
            column_name: fields.string_or_default("column_name")?,
            severity: fields.required_str("severity")?,
            status: fields.required_str("status")?,
            detected_at: fields.timestamp("detected_at")?,
            owners: fields.string_or_default("owners")?,
            tags: fields.string_or_default("tags")?,
            subscribers: fields.string_or_default("subscribers")?,
            channel: fields.string_or_default("channel")?,
            description: fields.string_or_default("description")?,
            meta: fields.object("meta")?,
            alert_suppression_interval: fields.interval()?,
            elementary_database_and_schema: context.elementary_database_and_schema.clone(),
            timezone: context.timezone.clone(),
        })
    }
}

impl AlertFactory for ModelAlert {
    const KIND: AlertKind = AlertKind::Model;

    fn build(record: &NormalizedRecord, context: &AlertContext) -> Result<Self, ConstructionError> {
        let fields = Fields(record);
        Ok(ModelAlert {
            id: fields.id()?,
            unique_id: fields.required_str("unique_id")?,
            alias: fields.required_str("alias")?,
            path: fields.string_or_default("path")?,
            original_path: fields.string_or_default("original_path")?,
            materialization: fields.string_or_default("materialization")?,
            message: fields.string_or_default("message")?,
            full_refresh: fields.flag("full_refresh")?,
            database_name: fields.string_or_default("database_name")?,
            schema_name: fields.string_or_default("schema_name")?,
            status: fields.required_str("status")?,
            detected_at: fields.timestamp("detected_at")?,
            owners: fields.string_or_default("owners")?,
            tags: fields.string_or_default("tags")?,
            subscribers: fields.string_or_default("subscribers")?,
            channel: fields.string_or_default("channel")?,
            description: fields.string_or_default("description")?,
            model_meta: fields.object("model_meta")?,
            alert_suppression_interval: fields.interval()?,
            elementary_database_and_schema: context.elementary_database_and_schema.clone(),
            timezone: context.timezone.clone(),
        })
    }
}

impl AlertFactory for SourceFreshnessAlert {
    const KIND: AlertKind = AlertKind::SourceFreshness;

    fn build(record: &NormalizedRecord, context: &AlertContext) -> Result<Self, ConstructionError> {
        let fields = Fields(record);
        Ok(SourceFreshnessAlert {
            id: fields.id()?,
            unique_id: fields.required_str("unique_id")?,
            source_name: fields.required_str("source_name")?,
            identifier: fields.required_str("identifier")?,
            status: fields.required_str("status")?,
            error: fields.optional_str("error")?,
            error_after: fields.optional_str("error_after")?,
            warn_after: fields.optional_str("warn_after")?,
            filter: fields.optional_str("filter")?,
            path: fields.string_or_default("path")?,
            max_loaded_at: fields.optional_timestamp("max_loaded_at")?,
            snapshotted_at: fields.optional_timestamp("snapshotted_at")?,
            max_loaded_at_time_ago_in_s: fields.optional_number("max_loaded_at_time_ago_in_s")?,
            database_name: fields.string_or_default("database_name")?,
            schema_name: fields.string_or_default("schema_name")?,
            detected_at: fields.timestamp("detected_at")?,
            owners: fields.string_or_default("owners")?,
            tags: fields.string_or_default("tags")?,
            subscribers: fields.string_or_default("subscribers")?,
            channel: fields.string_or_default("channel")?,
            description: fields.string_or_default("description")?,
            meta: fields.object("meta")?,
            alert_suppression_interval: fields.interval()?,
            elementary_database_and_schema: context.elementary_database_and_schema.clone(),
            timezone: context.timezone.clone(),
        })
    }
}

/// Typed accessors over a normalized row
struct Fields<'a>(&'a NormalizedRecord);

impl Fields<'_> {
    fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    fn id(&self) -> Result<String, ConstructionError> {
        self.0.id().ok_or(ConstructionError::MissingField("id"))
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, ConstructionError> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(invalid(field, format!("expected string, got {}", other))),
        }
    }

    fn required_str(&self, field: &'static str) -> Result<String, ConstructionError> {
        self.optional_str(field)?
            .ok_or(ConstructionError::MissingField(field))
    }

    fn string_or_default(&self, field: &'static str) -> Result<String, ConstructionError> {
        Ok(self.optional_str(field)?.unwrap_or_default())
    }

    fn optional_timestamp(&self, field: &'static str) -> Result<Option<NaiveDateTime>, ConstructionError> {
        self.optional_str(field)?
            .map(|raw| parse_timestamp(&raw).map_err(|e| invalid(field, e.to_string())))
            .transpose()
    }

    fn timestamp(&self, field: &'static str) -> Result<NaiveDateTime, ConstructionError> {
        self.optional_timestamp(field)?
            .ok_or(ConstructionError::MissingField(field))
    }

    fn optional_number(&self, field: &'static str) -> Result<Option<f64>, ConstructionError> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| invalid(field, format!("expected number, got {:?}", s))),
            Some(other) => Err(invalid(field, format!("expected number, got {}", other))),
        }
    }

    fn interval(&self) -> Result<f64, ConstructionError> {
        const FIELD: &str = "alert_suppression_interval";
        let hours = self.optional_number(FIELD)?.unwrap_or(0.0);
        if !hours.is_finite() || hours < 0.0 {
            return Err(invalid(FIELD, format!("expected non-negative hours, got {}", hours)));
        }
        Ok(hours)
    }

    fn flag(&self, field: &'static str) -> Result<bool, ConstructionError> {
        match self.value(field) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(invalid(field, format!("expected boolean, got {}", other))),
        }
    }

    fn object(&self, field: &'static str) -> Result<Map<String, Value>, ConstructionError> {
        match self.value(field) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(invalid(field, format!("expected object, got {}", other))),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> ConstructionError {
    ConstructionError::InvalidField { field, reason }
}
