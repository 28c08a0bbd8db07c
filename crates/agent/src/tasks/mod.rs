//! Long-running agent tasks.
//!
//! Each submodule provides a task struct whose `run` method is intended to
//! be spawned via `tokio::spawn`. All tasks accept a [`CancellationToken`]
//! for graceful shutdown and select on it alongside their own interval, so
//! they stop as soon as the current iteration finishes. A single iteration
//! is exposed as `tick` for direct testing.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod evaluator;
pub mod poller;
pub mod rollup;
pub mod telemetry;

pub use evaluator::AlertEvaluator;
pub use poller::SensorPoller;
pub use rollup::RollupAggregator;
pub use telemetry::TelemetryPublisher;
