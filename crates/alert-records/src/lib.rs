//! Alert Records
//!
//! Raw alert rows as returned by the warehouse query layer, their normalized
//! form, and the timestamp helpers shared by the reconciliation crates.

mod error;
mod kind;
mod normalizer;
mod record;
pub mod time;

pub use error::RecordError;
pub use kind::{AlertKind, TableRef};
pub use normalizer::normalize;
pub use record::{LastSentIndex, NormalizedRecord, RawRecord};
