//! Alert Monitor
//!
//! Wires the reconciler and delivery ledger into the alerts API used by the
//! notification runner, plus settings loading and logging setup.

mod api;
mod settings;

pub use api::AlertsApi;
pub use settings::{MonitorSettings, TableSettings};

use alerting::ReconcileError;
use std::str::FromStr;
use storage::StorageError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Initialize logging at the given level (`"info"`, `"debug"`, ...)
pub fn init_logging(level: &str) -> Result<(), MonitorError> {
    let level = Level::from_str(level).map_err(|e| MonitorError::Logging(e.to_string()))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MonitorError::Logging(e.to_string()))
}
