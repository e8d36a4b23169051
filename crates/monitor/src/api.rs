//! Alerts API
//!
//! The entry points used by the notification runner: fetch reconciled alerts,
//! persist skipped alerts, and record successful deliveries.

use crate::settings::{MonitorSettings, TableSettings};
use crate::MonitorError;
use alert_records::time::now_utc;
use alert_records::AlertKind;
use alerting::{AggregatedAlerts, AlertReconciler, SkippedAlert};
use chrono::NaiveDateTime;
use storage::{AlertStore, DeliveryBackend, DeliveryLedger};
use tracing::info;

/// Reconciles pending alerts and records their outcomes
pub struct AlertsApi<S, B> {
    reconciler: AlertReconciler<S>,
    ledger: DeliveryLedger<B>,
    tables: TableSettings,
    days_back: u32,
    disable_samples: bool,
}

impl<S: AlertStore, B: DeliveryBackend> AlertsApi<S, B> {
    /// Create the API over a read store and a delivery backend
    pub fn new(store: S, backend: B, settings: &MonitorSettings) -> Self {
        Self {
            reconciler: AlertReconciler::new(store, settings.reconciler.clone()),
            ledger: DeliveryLedger::with_chunk_size(backend, settings.chunk_size),
            tables: settings.tables.clone(),
            days_back: settings.days_back,
            disable_samples: settings.disable_samples,
        }
    }

    pub fn reconciler(&self) -> &AlertReconciler<S> {
        &self.reconciler
    }

    pub fn ledger(&self) -> &DeliveryLedger<B> {
        &self.ledger
    }

    /// Reconciled alerts of every kind
    pub fn get_new_alerts(
        &self,
        days_back: u32,
        disable_samples: bool,
    ) -> Result<AggregatedAlerts, MonitorError> {
        self.get_new_alerts_at(days_back, disable_samples, now_utc())
    }

    /// Reconciled alerts of every kind against a fixed time
    pub fn get_new_alerts_at(
        &self,
        days_back: u32,
        disable_samples: bool,
        now: NaiveDateTime,
    ) -> Result<AggregatedAlerts, MonitorError> {
        Ok(self.reconciler.reconcile_all_at(days_back, disable_samples, now)?)
    }

    /// Mark alerts of `kind` as skipped
    pub fn skip_alerts(&self, kind: AlertKind, alerts: &[SkippedAlert]) -> Result<(), MonitorError> {
        let ids: Vec<String> = alerts.iter().map(|a| a.id().to_string()).collect();
        self.ledger.mark_skipped(&ids, self.tables.table_for(kind))?;
        Ok(())
    }

    /// Mark alerts of `kind` as sent now
    pub fn update_sent_alerts(&self, kind: AlertKind, ids: &[String]) -> Result<(), MonitorError> {
        self.ledger.mark_sent(ids, self.tables.table_for(kind))?;
        Ok(())
    }

    /// Mark alerts of `kind` as sent at a fixed time
    pub fn update_sent_alerts_at(
        &self,
        kind: AlertKind,
        ids: &[String],
        sent_at: NaiveDateTime,
    ) -> Result<(), MonitorError> {
        self.ledger.mark_sent_at(ids, self.tables.table_for(kind), sent_at)?;
        Ok(())
    }

    /// Persist the skip partition of every kind, returning how many were skipped
    pub fn skip_suppressed(&self, alerts: &AggregatedAlerts) -> Result<usize, MonitorError> {
        for (kind, set) in alerts.iter() {
            self.skip_alerts(kind, &set.alerts_to_skip)?;
        }
        Ok(alerts.count_to_skip())
    }

    /// One cycle over the configured window: reconcile, then persist skips
    ///
    /// The returned alerts still need delivery; mark them with
    /// [`AlertsApi::update_sent_alerts`] once sent.
    pub fn poll(&self) -> Result<AggregatedAlerts, MonitorError> {
        self.poll_at(now_utc())
    }

    /// [`AlertsApi::poll`] against a fixed time
    pub fn poll_at(&self, now: NaiveDateTime) -> Result<AggregatedAlerts, MonitorError> {
        let alerts = self.get_new_alerts_at(self.days_back, self.disable_samples, now)?;
        let skipped = self.skip_suppressed(&alerts)?;
        info!(
            to_send = alerts.count_to_send(),
            skipped,
            "Alert cycle reconciled"
        );
        Ok(alerts)
    }
}
