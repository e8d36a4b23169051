//! Alert Reconciliation
//!
//! Builds typed alerts from normalized rows, applies per-entity suppression
//! windows, and partitions pending alerts into send, skip and malformed sets.

mod alert;
mod config;
mod error;
mod factory;
mod pending;
mod reconciled;
mod reconciler;
mod suppression;

pub use alert::{Alert, ModelAlert, SourceFreshnessAlert, TestAlert, TestType};
pub use config::{AlertContext, ReconcilerConfig};
pub use error::{ConstructionError, ReconcileError};
pub use factory::{build_alert, AlertFactory};
pub use pending::{MalformedAlert, PendingAlertSet};
pub use reconciled::{AggregatedAlerts, ReconciledAlertSet, SkippedAlert};
pub use reconciler::AlertReconciler;
pub use suppression::{SuppressionClock, SuppressionEvaluator, SuppressionVerdicts};
