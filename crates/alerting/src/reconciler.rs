//! Alert Reconciler
//!
//! One reconciliation of a kind fetches its pending rows, then the last send
//! time of each entity, builds the pending set, evaluates suppression and
//! partitions the result.

use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use crate::pending::PendingAlertSet;
use crate::reconciled::{AggregatedAlerts, ReconciledAlertSet};
use crate::suppression::SuppressionEvaluator;
use alert_records::time::now_utc;
use alert_records::AlertKind;
use chrono::NaiveDateTime;
use storage::{AlertStore, FetchOptions};
use tracing::info;

/// Reconciles pending alerts against their last notification times
pub struct AlertReconciler<S> {
    store: S,
    config: ReconcilerConfig,
    evaluator: SuppressionEvaluator,
}

impl<S: AlertStore> AlertReconciler<S> {
    /// Create a reconciler reading from `store`
    pub fn new(store: S, config: ReconcilerConfig) -> Self {
        info!("Creating alert reconciler with config: {:?}", config);
        let evaluator = SuppressionEvaluator::new(config.suppression_clock);
        Self {
            store,
            config,
            evaluator,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reconcile one kind against the current time
    pub fn reconcile(
        &self,
        kind: AlertKind,
        days_back: u32,
        disable_samples: bool,
    ) -> Result<ReconciledAlertSet, ReconcileError> {
        self.reconcile_at(kind, days_back, disable_samples, now_utc())
    }

    /// Reconcile one kind against a fixed time
    pub fn reconcile_at(
        &self,
        kind: AlertKind,
        days_back: u32,
        disable_samples: bool,
        now: NaiveDateTime,
    ) -> Result<ReconciledAlertSet, ReconcileError> {
        let pending = self.fetch_pending(kind, days_back, disable_samples)?;

        info!("Querying {} alerts last sent times.", kind);
        let last_sent = self.store.fetch_last_sent_times(kind, days_back)?;

        let verdicts = self.evaluator.evaluate(&pending, &last_sent, now)?;
        let reconciled = ReconciledAlertSet::partition(pending, &verdicts);

        info!(
            kind = %kind,
            to_send = reconciled.alerts_to_send.len(),
            malformed_to_send = reconciled.malformed_alerts_to_send.len(),
            to_skip = reconciled.alerts_to_skip.len(),
            "Reconciled alerts"
        );
        Ok(reconciled)
    }

    /// Reconcile every kind against the current time
    pub fn reconcile_all(
        &self,
        days_back: u32,
        disable_samples: bool,
    ) -> Result<AggregatedAlerts, ReconcileError> {
        self.reconcile_all_at(days_back, disable_samples, now_utc())
    }

    /// Reconcile every kind against a fixed time
    pub fn reconcile_all_at(
        &self,
        days_back: u32,
        disable_samples: bool,
        now: NaiveDateTime,
    ) -> Result<AggregatedAlerts, ReconcileError> {
        Ok(AggregatedAlerts {
            tests: self.reconcile_at(AlertKind::Test, days_back, disable_samples, now)?,
            models: self.reconcile_at(AlertKind::Model, days_back, disable_samples, now)?,
            source_freshnesses: self.reconcile_at(
                AlertKind::SourceFreshness,
                days_back,
                disable_samples,
                now,
            )?,
        })
    }

    /// Fetch and build the pending alerts of one kind
    ///
    /// Sample suppression only applies to test alerts.
    pub fn fetch_pending(
        &self,
        kind: AlertKind,
        days_back: u32,
        disable_samples: bool,
    ) -> Result<PendingAlertSet, ReconcileError> {
        info!("Querying {} alerts.", kind);
        let options = FetchOptions {
            disable_samples: disable_samples && kind == AlertKind::Test,
        };
        let records = self.store.fetch_pending(kind, days_back, &options)?;
        Ok(PendingAlertSet::from_records(kind, records, &self.config.context()))
    }
}
