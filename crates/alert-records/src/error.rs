//! Record Error Types

use thiserror::Error;

/// Errors while interpreting record values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// Timestamp in none of the accepted ISO-8601 shapes
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}
