//! Synthetic 0-100 air-quality index.
//!
//! Each metric with thresholds contributes 0 at or below its warning level,
//! 100 at or above its danger level, and a linear interpolation in between.
//! Contributions are weighted and summed. Any metric at or above danger
//! floors the score at [`DANGER_TRIGGER`].

use crate::reading::{Metric, Reading};
use crate::thresholds::{ThresholdPair, Thresholds};

/// Upper bound of the index and of a single metric's contribution.
pub const MAX_AQI: f64 = 100.0;

/// Minimum index reported while any metric is at or above danger.
pub const DANGER_TRIGGER: f64 = 70.0;

/// Relative weight of each metric in the index. Weights sum to 1.
pub fn weight(metric: Metric) -> f64 {
    match metric {
        Metric::Co2 => 0.40,
        Metric::Pm25 => 0.30,
        Metric::Humidity => 0.15,
        Metric::Temperature => 0.15,
    }
}

/// Unweighted 0-100 contribution of one value.
pub fn contribution(value: f64, pair: &ThresholdPair) -> f64 {
    if value <= pair.warning {
        0.0
    } else if value < pair.danger {
        (value - pair.warning) / (pair.danger - pair.warning) * MAX_AQI
    } else {
        MAX_AQI
    }
}

/// Compute the index for a reading. Metrics absent from `thresholds` are
/// skipped. Halves round to even.
pub fn air_quality_index(reading: &Reading, thresholds: &Thresholds) -> u8 {
    let mut aqi = 0.0;
    let mut danger_zone = false;

    for metric in Metric::ALL {
        let Some(pair) = thresholds.get(metric) else {
            continue;
        };
        let value = reading.value(metric);
        if value >= pair.danger {
            danger_zone = true;
        }
        aqi += contribution(value, pair) * weight(metric);
    }

    if danger_zone {
        aqi = aqi.max(DANGER_TRIGGER);
    }

    aqi.clamp(0.0, MAX_AQI).round_ties_even() as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
