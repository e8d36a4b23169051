//! Storage Layer
//!
//! Interfaces to the warehouse holding pending alerts and delivery state, the
//! chunked delivery ledger, and an in-memory repository implementing both.

mod ledger;
mod repository;
mod store;

pub use ledger::{DeliveryLedger, DEFAULT_CHUNK_SIZE};
pub use repository::InMemoryAlertStore;
pub use store::{decode_last_sent, decode_rows, AlertStore, DeliveryBackend, FetchOptions};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    QueryError(String),
    #[error("Write to {table} failed: {reason}")]
    WriteError { table: String, reason: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
