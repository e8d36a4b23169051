//! Suppression windows
//!
//! An alert is suppressed when its entity was notified no more than
//! `alert_suppression_interval` hours ago. Entities never notified, and
//! alerts with a zero interval, are always delivered.

use crate::error::ReconcileError;
use crate::pending::PendingAlertSet;
use alert_records::LastSentIndex;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: i64 = 86_400;

/// How the time since the last notification is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionClock {
    /// Whole seconds between the last notification and now
    #[default]
    Elapsed,
    /// Only the seconds-within-a-day part of that gap
    ///
    /// Matches the legacy behaviour where a send more than a day old can fall
    /// back inside the window.
    TimeOfDay,
}

/// Per-item suppression decisions, positionally aligned with a `PendingAlertSet`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionVerdicts {
    /// One flag per entry of `PendingAlertSet::alerts`
    pub alerts: Vec<bool>,
    /// One flag per entry of `PendingAlertSet::malformed_alerts`
    pub malformed_alerts: Vec<bool>,
}

impl SuppressionVerdicts {
    /// Number of suppressed items
    pub fn suppressed_count(&self) -> usize {
        self.alerts
            .iter()
            .chain(&self.malformed_alerts)
            .filter(|suppressed| **suppressed)
            .count()
    }
}

/// Computes which pending alerts are inside their suppression window
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressionEvaluator {
    clock: SuppressionClock,
}

impl SuppressionEvaluator {
    pub fn new(clock: SuppressionClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> SuppressionClock {
        self.clock
    }

    /// Suppression decision for every pending alert, typed or malformed
    ///
    /// Each item is judged on its own entity and interval, so items sharing
    /// an occurrence id never affect each other.
    pub fn evaluate(
        &self,
        pending: &PendingAlertSet,
        last_sent: &LastSentIndex,
        now: NaiveDateTime,
    ) -> Result<SuppressionVerdicts, ReconcileError> {
        let alerts = pending
            .alerts
            .iter()
            .map(|a| {
                self.is_suppressed(
                    Some(a.unique_id()),
                    Some(a.alert_suppression_interval()),
                    last_sent,
                    now,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let malformed_alerts = pending
            .malformed_alerts
            .iter()
            .map(|a| self.is_suppressed(a.unique_id(), a.alert_suppression_interval(), last_sent, now))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SuppressionVerdicts {
            alerts,
            malformed_alerts,
        })
    }

    /// Whether one entity is inside its window
    pub fn is_suppressed(
        &self,
        unique_id: Option<&str>,
        interval_hours: Option<f64>,
        last_sent: &LastSentIndex,
        now: NaiveDateTime,
    ) -> Result<bool, ReconcileError> {
        let (Some(unique_id), Some(interval_hours)) = (unique_id, interval_hours) else {
            return Ok(false);
        };
        if !(interval_hours > 0.0) {
            return Ok(false);
        }

        let last_sent_at = last_sent
            .last_sent_at(unique_id)
            .map_err(|source| ReconcileError::InvalidLastSent {
                unique_id: unique_id.to_string(),
                source,
            })?;

        Ok(match last_sent_at {
            Some(sent_at) => {
                self.elapsed_seconds(now - sent_at) as f64 / SECONDS_PER_HOUR <= interval_hours
            }
            None => false,
        })
    }

    fn elapsed_seconds(&self, delta: TimeDelta) -> i64 {
        match self.clock {
            SuppressionClock::Elapsed => delta.num_seconds(),
            SuppressionClock::TimeOfDay => {
                let whole = delta.num_seconds();
                let floor = if delta < TimeDelta::seconds(whole) { whole - 1 } else { whole };
                floor.rem_euclid(SECONDS_PER_DAY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::MalformedAlert;
    use alert_records::time::parse_timestamp;
    use alert_records::{normalize, AlertKind};
    use serde_json::{json, Value};

    fn at(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    fn index(entries: &[(&str, &str)]) -> LastSentIndex {
        entries.iter().copied().collect()
    }

    fn check(clock: SuppressionClock, interval: f64, last: &str, now: &str) -> bool {
        SuppressionEvaluator::new(clock)
            .is_suppressed(Some("m1"), Some(interval), &index(&[("m1", last)]), at(now))
            .unwrap()
    }

    #[test]
    fn test_window_example() {
        let elapsed = SuppressionClock::Elapsed;
        assert!(check(elapsed, 3.0, "2024-01-01T00:00:00", "2024-01-01T02:00:00"));
        assert!(!check(elapsed, 1.0, "2024-01-01T00:00:00", "2024-01-01T02:00:00"));
    }

    #[test]
    fn test_window_boundary() {
        let elapsed = SuppressionClock::Elapsed;
        assert!(check(elapsed, 2.0, "2024-01-01T00:00:00", "2024-01-01T02:00:00"));
        assert!(!check(elapsed, 2.0, "2024-01-01T00:00:00", "2024-01-01T02:00:01"));
        // Sub-second remainders are truncated
        assert!(check(elapsed, 2.0, "2024-01-01T00:00:00", "2024-01-01T02:00:00.900"));
    }

    #[test]
    fn test_first_seen_is_never_suppressed() {
        let evaluator = SuppressionEvaluator::default();
        let suppressed = evaluator
            .is_suppressed(Some("never-sent"), Some(1_000.0), &LastSentIndex::new(), at("2024-01-01"))
            .unwrap();
        assert!(!suppressed);
    }

    #[test]
    fn test_zero_interval_never_suppresses() {
        assert!(!check(SuppressionClock::Elapsed, 0.0, "2024-01-01T02:00:00", "2024-01-01T02:00:00"));
    }

    #[test]
    fn test_time_of_day_clock_wraps_daily() {
        let last = "2024-01-01T00:00:00";
        let now = "2024-01-02T02:00:00";
        assert!(check(SuppressionClock::TimeOfDay, 3.0, last, now));
        assert!(!check(SuppressionClock::Elapsed, 3.0, last, now));
    }

    #[test]
    fn test_time_of_day_clock_floors_negative_gaps() {
        // A send recorded half a second in the future looks almost a day old
        assert!(!check(SuppressionClock::TimeOfDay, 3.0, "2024-01-01T00:00:00.500", "2024-01-01T00:00:00"));
        assert!(check(SuppressionClock::Elapsed, 3.0, "2024-01-01T00:00:00.500", "2024-01-01T00:00:00"));
    }

    #[test]
    fn test_invalid_last_sent_is_an_error() {
        let err = SuppressionEvaluator::default()
            .is_suppressed(Some("m1"), Some(1.0), &index(&[("m1", "soon")]), at("2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidLastSent { unique_id, .. } if unique_id == "m1"));
    }

    fn malformed(id: &str, data: Value) -> MalformedAlert {
        let Value::Object(fields) = data else { unreachable!() };
        MalformedAlert {
            id: id.to_string(),
            kind: AlertKind::Model,
            data: normalize(fields),
            reason: "broken".to_string(),
        }
    }

    #[test]
    fn test_malformed_alerts_use_retained_data() {
        let pending = PendingAlertSet {
            alerts: Vec::new(),
            malformed_alerts: vec![
                malformed("x1", json!({"unique_id": "m1", "alert_suppression_interval": 5})),
                malformed("x2", json!({"unique_id": "m1", "alert_suppression_interval": "often"})),
                malformed("x3", json!({"alert_suppression_interval": 5})),
            ],
        };

        let verdicts = SuppressionEvaluator::default()
            .evaluate(&pending, &index(&[("m1", "2024-01-01 00:00:00")]), at("2024-01-01 01:00:00"))
            .unwrap();
        assert!(verdicts.alerts.is_empty());
        assert_eq!(verdicts.malformed_alerts, vec![true, false, false]);
        assert_eq!(verdicts.suppressed_count(), 1);
    }

    #[test]
    fn test_malformed_alerts_sharing_an_empty_id_are_judged_separately() {
        let pending = PendingAlertSet {
            alerts: Vec::new(),
            malformed_alerts: vec![
                malformed("", json!({"unique_id": "m1", "alert_suppression_interval": 3})),
                malformed("", json!({"unique_id": "m9", "alert_suppression_interval": 3})),
            ],
        };

        let verdicts = SuppressionEvaluator::default()
            .evaluate(&pending, &index(&[("m1", "2024-01-01T00:00:00")]), at("2024-01-01T02:00:00"))
            .unwrap();
        assert_eq!(verdicts.malformed_alerts, vec![true, false]);
    }
}
