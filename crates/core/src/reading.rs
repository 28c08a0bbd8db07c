//! Sensor reading types.
//!
//! A [`Reading`] is the flat record produced by the sensor driver. It is a
//! fixed record: every metric is always present, and a payload missing any
//! field is rejected at deserialization time rather than defaulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metric_names::{METRIC_CO2, METRIC_HUMIDITY, METRIC_PM25, METRIC_TEMPERATURE};
use crate::types::Timestamp;

/// One of the four monitored air-quality metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
    Co2,
    Pm25,
}

impl Metric {
    /// All metrics in a stable evaluation order.
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Co2,
        Metric::Pm25,
    ];

    /// Canonical wire name (see [`crate::metric_names`]).
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Temperature => METRIC_TEMPERATURE,
            Metric::Humidity => METRIC_HUMIDITY,
            Metric::Co2 => METRIC_CO2,
            Metric::Pm25 => METRIC_PM25,
        }
    }

    /// Human-readable label used in alert titles and messages.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Co2 => "CO2",
            Metric::Pm25 => "PM2.5",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::UnknownMetric(s.to_string()))
    }
}

/// A single flat sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub co2: u32,
    pub pm25: u32,
}

impl Reading {
    /// Value of a single metric as a float, for threshold comparison.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Co2 => f64::from(self.co2),
            Metric::Pm25 => f64::from(self.pm25),
        }
    }
}

/// A reading paired with the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub reading: Reading,
    pub taken_at: Timestamp,
}

impl Sample {
    /// Stamp a reading with the current time.
    pub fn now(reading: Reading) -> Self {
        Self {
            reading,
            taken_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
