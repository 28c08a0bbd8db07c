//! Per-metric hysteresis state machine.
//!
//! Pure logic, no I/O. [`AlertTracker`] keeps one [`AlertState`] per metric
//! and turns threshold crossings into [`AlertEvent`]s: an alert fires once
//! when a metric enters a level and stays silent while it remains there.
//! Dropping below the warning threshold returns the metric to normal
//! without emitting anything.

use std::collections::HashMap;

use crate::alert::{AlertEvent, AlertLevel};
use crate::reading::{Metric, Sample};
use crate::thresholds::{ThresholdPair, Thresholds};

/// Alert state of a single metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Normal,
    Warning,
    Danger,
}

/// Outcome of one evaluation tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Evaluation {
    /// Alerts to deliver, in metric order.
    pub alerts: Vec<AlertEvent>,
    /// Metrics that returned to normal on this tick.
    pub recovered: Vec<Metric>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.recovered.is_empty()
    }
}

/// Tracks the alert state of every metric across evaluation ticks.
///
/// Owned by a single evaluation loop; states are not persisted.
#[derive(Debug, Default)]
pub struct AlertTracker {
    states: HashMap<Metric, AlertState>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `metric` (normal if never evaluated).
    pub fn state(&self, metric: Metric) -> AlertState {
        self.states.get(&metric).copied().unwrap_or_default()
    }

    /// Evaluate one sample against a threshold snapshot.
    ///
    /// Metrics without thresholds keep their current state.
    pub fn evaluate(&mut self, sample: &Sample, thresholds: &Thresholds) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for metric in Metric::ALL {
            let Some(pair) = thresholds.get(metric) else {
                continue;
            };
            let value = sample.reading.value(metric);
            let current = self.state(metric);

            match next_state(current, value, pair) {
                Step::Stay => {}
                Step::Enter(level) => {
                    self.states.insert(metric, level.into());
                    let threshold = match level {
                        AlertLevel::Warning => pair.warning,
                        AlertLevel::Danger => pair.danger,
                    };
                    evaluation.alerts.push(AlertEvent {
                        metric,
                        level,
                        value,
                        threshold,
                        timestamp: sample.taken_at,
                    });
                }
                Step::Recover => {
                    self.states.insert(metric, AlertState::Normal);
                    evaluation.recovered.push(metric);
                }
            }
        }

        evaluation
    }
}

impl From<AlertLevel> for AlertState {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Warning => AlertState::Warning,
            AlertLevel::Danger => AlertState::Danger,
        }
    }
}

enum Step {
    Stay,
    Enter(AlertLevel),
    Recover,
}

fn next_state(current: AlertState, value: f64, pair: &ThresholdPair) -> Step {
    if value >= pair.danger {
        if current != AlertState::Danger {
            return Step::Enter(AlertLevel::Danger);
        }
    } else if value >= pair.warning {
        if current == AlertState::Normal {
            return Step::Enter(AlertLevel::Warning);
        }
    } else if current != AlertState::Normal {
        return Step::Recover;
    }
    Step::Stay
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
