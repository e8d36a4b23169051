//! Reconciler configuration

use crate::suppression::SuppressionClock;
use serde::{Deserialize, Serialize};

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Database and schema holding the monitoring tables, stamped on every alert
    pub elementary_database_and_schema: String,
    /// Display timezone, stamped on every alert
    pub timezone: String,
    /// How time since the last notification is measured
    pub suppression_clock: SuppressionClock,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            elementary_database_and_schema: String::new(),
            timezone: "UTC".to_string(),
            suppression_clock: SuppressionClock::Elapsed,
        }
    }
}

impl ReconcilerConfig {
    /// Factory context derived from this configuration
    pub fn context(&self) -> AlertContext {
        AlertContext {
            elementary_database_and_schema: self.elementary_database_and_schema.clone(),
            timezone: self.timezone.clone(),
        }
    }
}

/// Values every factory stamps onto the alerts it builds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertContext {
    pub elementary_database_and_schema: String,
    pub timezone: String,
}
