//! Alerting Error Types

use alert_records::RecordError;
use storage::StorageError;
use thiserror::Error;

/// A normalized row could not be turned into a typed alert
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    /// Required field absent, null or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field present with the wrong shape
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Test alert with a test type no factory handles
    #[error("Unknown test type: {0:?}")]
    UnknownTestType(String),
}

/// A reconciliation call failed; no partial result is produced
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Alert store query failed
    #[error(transparent)]
    Store(#[from] StorageError),

    /// Last-sent index holds an unreadable timestamp
    #[error("Invalid last sent time for {unique_id}: {source}")]
    InvalidLastSent {
        unique_id: String,
        #[source]
        source: RecordError,
    },
}
