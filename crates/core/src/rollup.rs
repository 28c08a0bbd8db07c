//! Fixed-window rollup of sensor readings.
//!
//! [`RollupWindow`] counts ticks. Each tick may or may not carry a reading;
//! ticks without one add nothing, so the mean divides by the samples
//! actually received rather than by the window length. When the window
//! closes the averaged [`RollupSummary`] is returned and the accumulators
//! are reset.

use serde::Serialize;

use crate::reading::{Metric, Reading};

/// Running `{sum, count}` for one metric.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Accumulator {
    pub sum: f64,
    pub count: u32,
}

impl Accumulator {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Arithmetic mean rounded half to even, or `None` with no samples.
    pub fn mean(&self) -> Option<i64> {
        (self.count > 0).then(|| (self.sum / f64::from(self.count)).round_ties_even() as i64)
    }
}

/// Period-averaged summary submitted to the backend. All integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollupSummary {
    pub temperature: i64,
    pub humidity: i64,
    pub co2: i64,
    pub pm25: i64,
}

/// Result of closing a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowClose {
    /// `None` when no reading arrived during the whole window.
    pub summary: Option<RollupSummary>,
    /// Number of readings that contributed.
    pub samples: u32,
}

/// Accumulates readings across a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct RollupWindow {
    window_ticks: u32,
    ticks: u32,
    temperature: Accumulator,
    humidity: Accumulator,
    co2: Accumulator,
    pm25: Accumulator,
}

impl RollupWindow {
    /// Create a window that closes every `window_ticks` ticks (minimum 1).
    pub fn new(window_ticks: u32) -> Self {
        Self {
            window_ticks: window_ticks.max(1),
            ticks: 0,
            temperature: Accumulator::default(),
            humidity: Accumulator::default(),
            co2: Accumulator::default(),
            pm25: Accumulator::default(),
        }
    }

    pub fn window_ticks(&self) -> u32 {
        self.window_ticks
    }

    /// Ticks recorded in the current window.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn accumulator(&self, metric: Metric) -> &Accumulator {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Co2 => &self.co2,
            Metric::Pm25 => &self.pm25,
        }
    }

    fn accumulator_mut(&mut self, metric: Metric) -> &mut Accumulator {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::Co2 => &mut self.co2,
            Metric::Pm25 => &mut self.pm25,
        }
    }

    /// Record one tick. Returns the closed window on the last tick.
    pub fn record(&mut self, reading: Option<&Reading>) -> Option<WindowClose> {
        if let Some(reading) = reading {
            for metric in Metric::ALL {
                self.accumulator_mut(metric).add(reading.value(metric));
            }
        }
        self.ticks += 1;

        if self.ticks < self.window_ticks {
            return None;
        }

        let close = WindowClose {
            summary: self.summary(),
            samples: self.temperature.count,
        };
        self.reset();
        Some(close)
    }

    /// Averaged summary of the current window so far.
    pub fn summary(&self) -> Option<RollupSummary> {
        Some(RollupSummary {
            temperature: self.temperature.mean()?,
            humidity: self.humidity.mean()?,
            co2: self.co2.mean()?,
            pm25: self.pm25.mean()?,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_ticks);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
