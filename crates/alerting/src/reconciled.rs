//! Partitioned reconciliation results

use crate::alert::Alert;
use crate::pending::{MalformedAlert, PendingAlertSet};
use crate::suppression::SuppressionVerdicts;
use alert_records::AlertKind;
use serde::Serialize;

/// An alert placed in the skip partition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SkippedAlert {
    Alert(Alert),
    Malformed(MalformedAlert),
}

impl SkippedAlert {
    pub fn id(&self) -> &str {
        match self {
            SkippedAlert::Alert(alert) => alert.id(),
            SkippedAlert::Malformed(alert) => &alert.id,
        }
    }
}

/// Pending alerts of one kind split into send, malformed-send and skip
///
/// The three partitions are disjoint and together hold every pending item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciledAlertSet {
    pub alerts_to_send: Vec<Alert>,
    pub malformed_alerts_to_send: Vec<MalformedAlert>,
    pub alerts_to_skip: Vec<SkippedAlert>,
}

impl ReconciledAlertSet {
    /// Partition pending alerts by their per-item suppression verdicts
    ///
    /// Items without a verdict are sent.
    pub fn partition(pending: PendingAlertSet, verdicts: &SuppressionVerdicts) -> Self {
        let suppressed = |flags: &[bool], index: usize| flags.get(index).copied().unwrap_or(false);

        let (skipped, alerts_to_send): (Vec<_>, Vec<_>) = pending
            .alerts
            .into_iter()
            .enumerate()
            .partition(|(index, _)| suppressed(verdicts.alerts.as_slice(), *index));
        let (skipped_malformed, malformed_alerts_to_send): (Vec<_>, Vec<_>) = pending
            .malformed_alerts
            .into_iter()
            .enumerate()
            .partition(|(index, _)| suppressed(verdicts.malformed_alerts.as_slice(), *index));

        let alerts_to_skip = skipped
            .into_iter()
            .map(|(_, alert)| SkippedAlert::Alert(alert))
            .chain(skipped_malformed.into_iter().map(|(_, alert)| SkippedAlert::Malformed(alert)))
            .collect();

        Self {
            alerts_to_send: alerts_to_send.into_iter().map(|(_, alert)| alert).collect(),
            malformed_alerts_to_send: malformed_alerts_to_send.into_iter().map(|(_, alert)| alert).collect(),
            alerts_to_skip,
        }
    }

    /// Ids to mark sent once delivery succeeds
    pub fn send_ids(&self) -> Vec<String> {
        self.alerts_to_send
            .iter()
            .map(|a| a.id().to_string())
            .chain(self.malformed_alerts_to_send.iter().map(|a| a.id.clone()))
            .collect()
    }

    /// Ids to mark skipped
    pub fn skip_ids(&self) -> Vec<String> {
        self.alerts_to_skip.iter().map(|a| a.id().to_string()).collect()
    }

    /// Total number of items across all partitions
    pub fn len(&self) -> usize {
        self.alerts_to_send.len() + self.malformed_alerts_to_send.len() + self.alerts_to_skip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reconciled alerts of every kind for one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedAlerts {
    pub tests: ReconciledAlertSet,
    pub models: ReconciledAlertSet,
    pub source_freshnesses: ReconciledAlertSet,
}

impl AggregatedAlerts {
    pub fn get(&self, kind: AlertKind) -> &ReconciledAlertSet {
        match kind {
            AlertKind::Test => &self.tests,
            AlertKind::Model => &self.models,
            AlertKind::SourceFreshness => &self.source_freshnesses,
        }
    }

    /// Each kind with its result
    pub fn iter(&self) -> impl Iterator<Item = (AlertKind, &ReconciledAlertSet)> {
        AlertKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Number of alerts, typed and malformed, to deliver this cycle
    pub fn count_to_send(&self) -> usize {
        self.iter()
            .map(|(_, set)| set.alerts_to_send.len() + set.malformed_alerts_to_send.len())
            .sum()
    }

    /// Number of alerts to skip this cycle
    pub fn count_to_skip(&self) -> usize {
        self.iter().map(|(_, set)| set.alerts_to_skip.len()).sum()
    }
}
