//! Air-quality alert types for threshold crossings.

use serde::Serialize;

use crate::reading::Metric;
use crate::types::Timestamp;

/// Level a metric has crossed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Value reached the warning threshold but not the danger threshold.
    Warning,
    /// Value reached the danger threshold.
    Danger,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            AlertLevel::Warning => Severity::Medium,
            AlertLevel::Danger => Severity::High,
        }
    }
}

/// Delivery severity of an alert event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// A single threshold crossing emitted by the hysteresis tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub metric: Metric,
    pub level: AlertLevel,
    /// The observed value that triggered the alert.
    pub value: f64,
    /// The threshold value that was reached.
    pub threshold: f64,
    /// When the triggering sample was taken.
    pub timestamp: Timestamp,
}

impl AlertEvent {
    pub fn severity(&self) -> Severity {
        self.level.severity()
    }

    /// Short title, e.g. `"CO2 danger"`.
    pub fn title(&self) -> String {
        format!("{} {}", self.metric.label(), self.level.as_str())
    }

    pub fn message(&self) -> String {
        format!(
            "{} is above the {} threshold ({} >= {})",
            self.metric.label(),
            self.level.as_str(),
            self.value,
            self.threshold,
        )
    }
}
