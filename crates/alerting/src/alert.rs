//! Typed alerts

use crate::error::ConstructionError;
use alert_records::AlertKind;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Flavour of a test alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Generic or singular dbt test
    DbtTest,
    /// Elementary anomaly detection monitor
    AnomalyDetection,
    /// Elementary schema change monitor
    SchemaChange,
}

impl TestType {
    /// Whether alerts of this type must name a `test_sub_type`
    pub fn requires_sub_type(&self) -> bool {
        !matches!(self, TestType::DbtTest)
    }
}

impl FromStr for TestType {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dbt_test" => Ok(TestType::DbtTest),
            "anomaly_detection" => Ok(TestType::AnomalyDetection),
            "schema_change" => Ok(TestType::SchemaChange),
            other => Err(ConstructionError::UnknownTestType(other.to_string())),
        }
    }
}

/// Failed or warning test result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestAlert {
    /// Occurrence id
    pub id: String,
    /// Monitored entity id
    pub unique_id: String,
    /// Model the test is attached to
    pub model_unique_id: Option<String>,
    pub test_type: TestType,
    /// Monitor flavour, empty for plain dbt tests
    pub test_sub_type: String,
    pub test_name: String,
    pub test_short_name: String,
    /// Decoded test arguments
    pub test_params: Map<String, Value>,
    /// Human-readable failure summary
    pub test_results_description: String,
    /// Query that reproduces the failing rows
    pub test_results_query: String,
    /// Sampled failing rows, absent when samples are disabled
    pub test_rows_sample: Option<Value>,
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
    /// Tested column, empty for table-level tests
    pub column_name: String,
    /// `warn` or `error`
    pub severity: String,
    /// Result status as reported by the run
    pub status: String,
    /// When the failure was recorded
    pub detected_at: NaiveDateTime,
    /// Owners resolved from meta
    pub owners: String,
    pub tags: String,
    /// Subscribers resolved from meta
    pub subscribers: String,
    /// Notification channel override
    pub channel: String,
    pub description: String,
    /// Decoded entity meta
    pub meta: Map<String, Value>,
    /// Suppression window in hours, `0` never suppresses
    pub alert_suppression_interval: f64,
    /// Location of the monitoring schema
    pub elementary_database_and_schema: String,
    /// Timezone used when rendering timestamps
    pub timezone: String,
}

/// Model or snapshot run failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAlert {
    /// Occurrence id
    pub id: String,
    /// Monitored entity id
    pub unique_id: String,
    /// Relation name
    pub alias: String,
    pub path: String,
    /// Path of the source file in the project
    pub original_path: String,
    /// Materialization strategy, `snapshot` for snapshots
    pub materialization: String,
    /// Error message from the run
    pub message: String,
    /// Whether the run was a full refresh
    pub full_refresh: bool,
    pub database_name: String,
    pub schema_name: String,
    /// Result status as reported by the run
    pub status: String,
    /// When the failure was recorded
    pub detected_at: NaiveDateTime,
    /// Owners resolved from meta
    pub owners: String,
    pub tags: String,
    /// Subscribers resolved from meta
    pub subscribers: String,
    /// Notification channel override
    pub channel: String,
    pub description: String,
    /// Decoded model meta
    pub model_meta: Map<String, Value>,
    /// Suppression window in hours, `0` never suppresses
    pub alert_suppression_interval: f64,
    /// Location of the monitoring schema
    pub elementary_database_and_schema: String,
    /// Timezone used when rendering timestamps
    pub timezone: String,
}

impl ModelAlert {
    pub fn is_snapshot(&self) -> bool {
        self.materialization.eq_ignore_ascii_case("snapshot")
    }
}

/// Stale or erroring source freshness check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFreshnessAlert {
    /// Occurrence id
    pub id: String,
    /// Monitored entity id
    pub unique_id: String,
    pub source_name: String,
    /// Source table identifier
    pub identifier: String,
    /// Result status as reported by the run
    pub status: String,
    /// Freshness check error, if the check itself failed
    pub error: Option<String>,
    /// Error threshold as configured
    pub error_after: Option<String>,
    /// Warning threshold as configured
    pub warn_after: Option<String>,
    /// Filter applied to the freshness query
    pub filter: Option<String>,
    pub path: String,
    /// Latest load time seen by the check
    pub max_loaded_at: Option<NaiveDateTime>,
    /// When the check ran
    pub snapshotted_at: Option<NaiveDateTime>,
    /// Age of the latest load at check time
    pub max_loaded_at_time_ago_in_s: Option<f64>,
    pub database_name: String,
    pub schema_name: String,
    /// When the failure was recorded
    pub detected_at: NaiveDateTime,
    /// Owners resolved from meta
    pub owners: String,
    pub tags: String,
    /// Subscribers resolved from meta
    pub subscribers: String,
    /// Notification channel override
    pub channel: String,
    pub description: String,
    /// Decoded entity meta
    pub meta: Map<String, Value>,
    /// Suppression window in hours, `0` never suppresses
    pub alert_suppression_interval: f64,
    /// Location of the monitoring schema
    pub elementary_database_and_schema: String,
    /// Timezone used when rendering timestamps
    pub timezone: String,
}

/// A well-formed alert of any kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    Test(TestAlert),
    Model(ModelAlert),
    SourceFreshness(SourceFreshnessAlert),
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Alert::Test(_) => AlertKind::Test,
            Alert::Model(_) => AlertKind::Model,
            Alert::SourceFreshness(_) => AlertKind::SourceFreshness,
        }
    }

    /// Occurrence id, the delivery-tracking key
    pub fn id(&self) -> &str {
        match self {
            Alert::Test(a) => &a.id,
            Alert::Model(a) => &a.id,
            Alert::SourceFreshness(a) => &a.id,
        }
    }

    /// Monitored entity id, the suppression-tracking key
    pub fn unique_id(&self) -> &str {
        match self {
            Alert::Test(a) => &a.unique_id,
            Alert::Model(a) => &a.unique_id,
            Alert::SourceFreshness(a) => &a.unique_id,
        }
    }

    /// Cooldown in hours, `0` never suppresses
    pub fn alert_suppression_interval(&self) -> f64 {
        match self {
            Alert::Test(a) => a.alert_suppression_interval,
            Alert::Model(a) => a.alert_suppression_interval,
            Alert::SourceFreshness(a) => a.alert_suppression_interval,
        }
    }

    pub fn detected_at(&self) -> NaiveDateTime {
        match self {
            Alert::Test(a) => a.detected_at,
            Alert::Model(a) => a.detected_at,
            Alert::SourceFreshness(a) => a.detected_at,
        }
    }
}

impl From<TestAlert> for Alert {
    fn from(alert: TestAlert) -> Self {
        Alert::Test(alert)
    }
}

impl From<ModelAlert> for Alert {
    fn from(alert: ModelAlert) -> Self {
        Alert::Model(alert)
    }
}

impl From<SourceFreshnessAlert> for Alert {
    fn from(alert: SourceFreshnessAlert) -> Self {
        Alert::SourceFreshness(alert)
    }
}
