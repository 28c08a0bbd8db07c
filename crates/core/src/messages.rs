//! Wire shapes for the publish and control channels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alert::{AlertEvent, Severity};
use crate::metric_names::{REQ_CHANGE_THRESHOLDS, REQ_SEND_ALERT, REQ_SEND_TELEMETRY};
use crate::reading::Reading;
use crate::rollup::RollupSummary;
use crate::thresholds::ThresholdPair;

/// Outgoing alert payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub request_type: &'static str,
    pub title: String,
    pub message: String,
    pub value: f64,
    /// Level name, `"warning"` or `"danger"`.
    pub status: &'static str,
    /// Informational only; not part of the wire payload and not read by
    /// any transport.
    #[serde(skip)]
    pub severity: Severity,
}

impl From<&AlertEvent> for AlertMessage {
    fn from(event: &AlertEvent) -> Self {
        Self {
            request_type: REQ_SEND_ALERT,
            title: event.title(),
            message: event.message(),
            value: event.value,
            status: event.level.as_str(),
            severity: event.severity(),
        }
    }
}

/// Telemetry values as published, with the legacy field names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryValues {
    pub temperature: f64,
    pub humidity: f64,
    pub co2_level: u32,
    pub pm2_level: u32,
}

impl From<&Reading> for TelemetryValues {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            co2_level: reading.co2,
            pm2_level: reading.pm25,
        }
    }
}

/// Outgoing periodic telemetry payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryMessage {
    pub request_type: &'static str,
    pub sensor_id: String,
    pub aqi: u8,
    pub telemetry: TelemetryValues,
}

impl TelemetryMessage {
    pub fn new(sensor_id: impl Into<String>, reading: &Reading, aqi: u8) -> Self {
        Self {
            request_type: REQ_SEND_TELEMETRY,
            sensor_id: sensor_id.into(),
            aqi,
            telemetry: reading.into(),
        }
    }
}

/// Anything the agent delivers to the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Alert(AlertMessage),
    Telemetry(TelemetryMessage),
    Summary(RollupSummary),
}

impl OutboundMessage {
    /// Short kind name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Alert(_) => "alert",
            OutboundMessage::Telemetry(_) => "telemetry",
            OutboundMessage::Summary(_) => "summary",
        }
    }
}

/// Incoming control-channel message.
///
/// Only the envelope is required; `thresholds` is validated separately so
/// that unrelated request types parse and can be ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    pub request_type: String,
    #[serde(default)]
    pub thresholds: Option<HashMap<String, ThresholdPair>>,
}

impl ControlMessage {
    pub fn is_threshold_change(&self) -> bool {
        self.request_type == REQ_CHANGE_THRESHOLDS
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
