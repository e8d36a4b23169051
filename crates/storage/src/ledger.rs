//! Delivery Ledger
//!
//! Persists send and skip outcomes in fixed-size batches. Batches are issued in
//! order and the first failure stops the call; batches written before it stay
//! written.

use crate::store::DeliveryBackend;
use crate::StorageError;
use alert_records::time::{format_timestamp, now_utc};
use alert_records::TableRef;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

/// Ids per backend write
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Chunked writer of delivery outcomes
pub struct DeliveryLedger<B> {
    backend: B,
    chunk_size: usize,
}

impl<B: DeliveryBackend> DeliveryLedger<B> {
    /// Create a ledger with the default chunk size
    pub fn new(backend: B) -> Self {
        Self::with_chunk_size(backend, DEFAULT_CHUNK_SIZE)
    }

    /// Create a ledger with a custom chunk size (at least 1)
    pub fn with_chunk_size(backend: B, chunk_size: usize) -> Self {
        Self {
            backend,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Mark alerts as sent now
    pub fn mark_sent(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError> {
        self.mark_sent_at(ids, table, now_utc())
    }

    /// Mark alerts as sent at the given time
    pub fn mark_sent_at(
        &self,
        ids: &[String],
        table: &TableRef,
        sent_at: NaiveDateTime,
    ) -> Result<(), StorageError> {
        let sent_at = format_timestamp(sent_at);
        self.write_chunks(ids, table, "sent", |chunk| {
            self.backend.update_sent(chunk, &sent_at, table)
        })
    }

    /// Mark alerts as skipped
    pub fn mark_skipped(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError> {
        self.write_chunks(ids, table, "skipped", |chunk| {
            self.backend.update_skipped(chunk, table)
        })
    }

    fn write_chunks<F>(
        &self,
        ids: &[String],
        table: &TableRef,
        outcome: &str,
        mut write: F,
    ) -> Result<(), StorageError>
    where
        F: FnMut(&[String]) -> Result<(), StorageError>,
    {
        if ids.is_empty() {
            return Ok(());
        }

        let total = ids.len().div_ceil(self.chunk_size);
        for (index, chunk) in ids.chunks(self.chunk_size).enumerate() {
            debug!(table = %table, batch = index + 1, total, size = chunk.len(), "Marking alerts {}", outcome);
            if let Err(e) = write(chunk) {
                warn!(
                    table = %table,
                    committed_batches = index,
                    total,
                    "Failed to mark alerts {}: {}", outcome, e
                );
                return Err(e);
            }
        }

        info!(table = %table, count = ids.len(), "Marked alerts {}", outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Sent { ids: Vec<String>, sent_at: String, table: String },
        Skipped { ids: Vec<String>, table: String },
    }

    /// Records calls; fails the call with the given index
    #[derive(Default)]
    struct RecordingBackend {
        calls: RefCell<Vec<Call>>,
        fail_on_call: Option<usize>,
    }

    impl RecordingBackend {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Default::default()
            }
        }

        fn check_failure(&self, table: &TableRef) -> Result<(), StorageError> {
            if self.fail_on_call == Some(self.calls.borrow().len()) {
                return Err(StorageError::WriteError {
                    table: table.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(())
        }
    }

    impl DeliveryBackend for RecordingBackend {
        fn update_sent(&self, ids: &[String], sent_at: &str, table: &TableRef) -> Result<(), StorageError> {
            self.check_failure(table)?;
            self.calls.borrow_mut().push(Call::Sent {
                ids: ids.to_vec(),
                sent_at: sent_at.to_string(),
                table: table.to_string(),
            });
            Ok(())
        }

        fn update_skipped(&self, ids: &[String], table: &TableRef) -> Result<(), StorageError> {
            self.check_failure(table)?;
            self.calls.borrow_mut().push(Call::Skipped {
                ids: ids.to_vec(),
                table: table.to_string(),
            });
            Ok(())
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("alert-{i}")).collect()
    }

    fn sent_ids(call: &Call) -> &[String] {
        match call {
            Call::Sent { ids, .. } | Call::Skipped { ids, .. } => ids,
        }
    }

    #[test]
    fn test_mark_sent_chunks_125_ids() {
        let ledger = DeliveryLedger::new(RecordingBackend::default());
        let all = ids(125);
        let sent_at = NaiveDateTime::parse_from_str("2024-01-01 02:00:00", "%Y-%m-%d %H:%M:%S").unwrap();

        ledger.mark_sent_at(&all, &TableRef::new("alerts"), sent_at).unwrap();

        let calls = ledger.backend().calls.borrow();
        let sizes: Vec<_> = calls.iter().map(|c| sent_ids(c).len()).collect();
        assert_eq!(sizes, vec![50, 50, 25]);

        let written: Vec<String> = calls.iter().flat_map(|c| sent_ids(c).to_vec()).collect();
        assert_eq!(written, all);

        for call in calls.iter() {
            match call {
                Call::Sent { sent_at, table, .. } => {
                    assert_eq!(sent_at, "2024-01-01 02:00:00");
                    assert_eq!(table, "alerts");
                }
                other => panic!("unexpected call {other:?}"),
            }
        }
    }

    #[test]
    fn test_mark_skipped_uses_skip_writes() {
        let ledger = DeliveryLedger::with_chunk_size(RecordingBackend::default(), 2);
        ledger.mark_skipped(&ids(3), &TableRef::new("alerts_models")).unwrap();

        let calls = ledger.backend().calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|c| matches!(c, Call::Skipped { table, .. } if table == "alerts_models")));
    }

    #[test]
    fn test_empty_ids_issue_no_writes() {
        let ledger = DeliveryLedger::new(RecordingBackend::default());
        ledger.mark_sent(&[], &TableRef::new("alerts")).unwrap();
        ledger.mark_skipped(&[], &TableRef::new("alerts")).unwrap();
        assert!(ledger.backend().calls.borrow().is_empty());
    }

    #[test]
    fn test_failure_aborts_remaining_batches() {
        let ledger = DeliveryLedger::new(RecordingBackend::failing_on(1));
        let err = ledger.mark_skipped(&ids(125), &TableRef::new("alerts")).unwrap_err();

        assert_eq!(
            err,
            StorageError::WriteError {
                table: "alerts".to_string(),
                reason: "connection reset".to_string(),
            }
        );
        // First batch stays committed, third is never attempted
        assert_eq!(ledger.backend().calls.borrow().len(), 1);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let ledger = DeliveryLedger::with_chunk_size(RecordingBackend::default(), 0);
        assert_eq!(ledger.chunk_size(), 1);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_id_written_exactly_once(count in 0usize..400, chunk_size in 1usize..80) {
                let ledger = DeliveryLedger::with_chunk_size(RecordingBackend::default(), chunk_size);
                let all = ids(count);
                ledger.mark_skipped(&all, &TableRef::new("alerts")).unwrap();

                let calls = ledger.backend().calls.borrow();
                prop_assert_eq!(calls.len(), count.div_ceil(chunk_size));
                prop_assert!(calls.iter().all(|c| sent_ids(c).len() <= chunk_size));
                let written: Vec<String> = calls.iter().flat_map(|c| sent_ids(c).to_vec()).collect();
                prop_assert_eq!(written, all);
            }
        }
    }
}
