//! Rollup aggregation loop.
//!
//! Samples the store every tick and submits the window average to the
//! backend once the window closes. A sample already counted (same
//! timestamp, i.e. the poller produced nothing new) adds nothing, so a
//! sensor outage shrinks the sample count instead of repeating stale
//! values. The window resets whether or not the submission succeeds.

use std::sync::Arc;
use std::time::Duration;

use airwatch_core::messages::OutboundMessage;
use airwatch_core::rollup::{RollupWindow, WindowClose};
use airwatch_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::publish::PublishClient;
use crate::store::TelemetryStore;

pub struct RollupAggregator {
    store: Arc<TelemetryStore>,
    publisher: Arc<PublishClient>,
    window: RollupWindow,
    last_counted: Option<Timestamp>,
    interval: Duration,
}

impl RollupAggregator {
    pub fn new(
        store: Arc<TelemetryStore>,
        publisher: Arc<PublishClient>,
        window_ticks: u32,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            window: RollupWindow::new(window_ticks),
            last_counted: None,
            interval,
        }
    }

    pub fn window(&self) -> &RollupWindow {
        &self.window
    }

    /// Record one tick; on window close, submit the summary.
    pub async fn tick(&mut self) -> Option<WindowClose> {
        let fresh = self
            .store
            .snapshot()
            .await
            .filter(|sample| self.last_counted != Some(sample.taken_at));
        if let Some(sample) = &fresh {
            self.last_counted = Some(sample.taken_at);
        }

        let close = self.window.record(fresh.as_ref().map(|s| &s.reading))?;

        match close.summary {
            Some(summary) => {
                let message = OutboundMessage::Summary(summary);
                match self.publisher.publish(&message).await {
                    Ok(()) => tracing::info!(samples = close.samples, "Rollup summary submitted"),
                    Err(e) => tracing::error!(
                        samples = close.samples,
                        status = e.status(),
                        error = %e,
                        "Rollup summary submission failed, window dropped",
                    ),
                }
            }
            None => tracing::warn!(
                ticks = self.window.window_ticks(),
                "No samples during rollup window, nothing submitted",
            ),
        }

        Some(close)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            window_ticks = self.window.window_ticks(),
            "Rollup aggregator started",
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Rollup aggregator stopped");
    }
}
