//! Pending alerts of one kind, before suppression

use crate::alert::Alert;
use crate::config::AlertContext;
use crate::factory::build_alert;
use alert_records::{normalize, AlertKind, NormalizedRecord, RawRecord};
use serde::Serialize;
use tracing::{debug, error};

/// A row that could not be built into a typed alert
///
/// The normalized row is retained verbatim for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedAlert {
    pub id: String,
    pub kind: AlertKind,
    pub data: NormalizedRecord,
    /// Why construction failed
    pub reason: String,
}

impl MalformedAlert {
    pub fn unique_id(&self) -> Option<&str> {
        self.data.unique_id()
    }

    pub fn alert_suppression_interval(&self) -> Option<f64> {
        self.data.alert_suppression_interval()
    }
}

/// Typed and malformed alerts fetched in one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingAlertSet {
    pub alerts: Vec<Alert>,
    pub malformed_alerts: Vec<MalformedAlert>,
}

impl PendingAlertSet {
    /// Normalize and build every raw row of `kind`
    ///
    /// Rows the factory rejects become malformed alerts; none are dropped.
    pub fn from_records(kind: AlertKind, records: Vec<RawRecord>, context: &AlertContext) -> Self {
        let (alerts, malformed_alerts): (Vec<_>, Vec<_>) = records
            .into_iter()
            .map(normalize)
            .map(|record| match build_alert(kind, &record, context) {
                Ok(alert) => Ok(alert),
                Err(e) => {
                    debug!(kind = %kind, "Malformed alert: {}", e);
                    Err(MalformedAlert {
                        id: record.id().unwrap_or_default(),
                        kind,
                        data: record,
                        reason: e.to_string(),
                    })
                }
            })
            .partition(Result::is_ok);

        let pending = Self {
            alerts: alerts.into_iter().filter_map(Result::ok).collect(),
            malformed_alerts: malformed_alerts.into_iter().filter_map(Result::err).collect(),
        };

        if !pending.malformed_alerts.is_empty() {
            error!(
                kind = %kind,
                count = pending.malformed_alerts.len(),
                "Failed to parse some alerts."
            );
        }
        pending
    }

    /// Total number of pending items
    pub fn len(&self) -> usize {
        self.alerts.len() + self.malformed_alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
