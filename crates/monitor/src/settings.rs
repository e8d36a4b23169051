//! Monitor settings
//!
//! Read from an optional file, then `MONITOR__`-prefixed environment
//! variables (e.g. `MONITOR__DAYS_BACK=3`, `MONITOR__RECONCILER__TIMEZONE=UTC`).

use crate::MonitorError;
use alert_records::{AlertKind, TableRef};
use alerting::ReconcilerConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use storage::DEFAULT_CHUNK_SIZE;

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Factory context and suppression clock
    pub reconciler: ReconcilerConfig,
    /// Lookback window for pending alerts and last send times
    pub days_back: u32,
    /// Omit sampled failing rows from test alerts
    pub disable_samples: bool,
    /// Ids per ledger write
    pub chunk_size: usize,
    /// Maximum log level
    pub log_level: String,
    /// Delivery table per kind
    pub tables: TableSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            days_back: 7,
            disable_samples: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_level: "info".to_string(),
            tables: TableSettings::default(),
        }
    }
}

impl MonitorSettings {
    /// Load from an optional settings file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix("MONITOR").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Load from TOML text, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self, MonitorError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Delivery table per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub tests: TableRef,
    pub models: TableRef,
    pub source_freshnesses: TableRef,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            tests: AlertKind::Test.default_table(),
            models: AlertKind::Model.default_table(),
            source_freshnesses: AlertKind::SourceFreshness.default_table(),
        }
    }
}

impl TableSettings {
    pub fn table_for(&self, kind: AlertKind) -> &TableRef {
        match kind {
            AlertKind::Test => &self.tests,
            AlertKind::Model => &self.models,
            AlertKind::SourceFreshness => &self.source_freshnesses,
        }
    }
}
