//! Alert kinds and delivery tables

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three monitored-entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// dbt tests, anomaly detection and schema change tests
    Test,
    /// Model and snapshot run failures
    Model,
    /// Source freshness checks
    SourceFreshness,
}

impl AlertKind {
    /// Every kind, in reporting order
    pub const ALL: [AlertKind; 3] = [AlertKind::Test, AlertKind::Model, AlertKind::SourceFreshness];

    /// Stable name used in logs and configuration keys
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Test => "test",
            AlertKind::Model => "model",
            AlertKind::SourceFreshness => "source_freshness",
        }
    }

    /// Table holding delivery state for this kind
    pub fn default_table(&self) -> TableRef {
        let name = match self {
            AlertKind::Test => "alerts",
            AlertKind::Model => "alerts_models",
            AlertKind::SourceFreshness => "alerts_source_freshness",
        };
        TableRef::new(name)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a backing table in the alert store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRef(String);

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
