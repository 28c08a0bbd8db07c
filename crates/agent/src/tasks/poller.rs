//! Sensor polling into the telemetry store.
//!
//! The only writer of the [`TelemetryStore`]. A failed read leaves the
//! previous sample in place; nothing downstream is told.

use std::sync::Arc;
use std::time::Duration;

use airwatch_core::Sample;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sensor::SensorSource;
use crate::store::TelemetryStore;

pub struct SensorPoller<S> {
    source: S,
    store: Arc<TelemetryStore>,
    interval: Duration,
    consecutive_failures: u32,
}

impl<S: SensorSource> SensorPoller<S> {
    pub fn new(source: S, store: Arc<TelemetryStore>, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
            consecutive_failures: 0,
        }
    }

    /// Read once and store the result. Returns whether a sample was stored.
    pub async fn tick(&mut self) -> bool {
        match self.source.read().await {
            Ok(reading) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        failures = self.consecutive_failures,
                        "Sensor readings resumed",
                    );
                    self.consecutive_failures = 0;
                }
                self.store.write(Sample::now(reading)).await;
                true
            }
            Err(e) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures == 1 {
                    tracing::warn!(error = %e, "Sensor read failed, keeping previous sample");
                } else {
                    tracing::debug!(
                        failures = self.consecutive_failures,
                        error = %e,
                        "Sensor read still failing",
                    );
                }
                false
            }
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Sensor poller started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Sensor poller stopped");
    }
}
