//! Air-quality domain logic for the airwatch agent.
//!
//! Everything in this crate is pure: readings, thresholds, the hysteresis
//! alert tracker, the air-quality index, rollup windows and wire shapes.
//! The agent crate owns all I/O and concurrency.

pub mod alert;
pub mod aqi;
pub mod error;
pub mod hysteresis;
pub mod messages;
pub mod metric_names;
pub mod reading;
pub mod rollup;
pub mod thresholds;
pub mod types;

pub use error::CoreError;
pub use reading::{Metric, Reading, Sample};
pub use thresholds::{ThresholdPair, Thresholds};
