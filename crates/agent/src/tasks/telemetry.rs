//! Periodic telemetry publishing. Reporting only; no alerting here.

use std::sync::Arc;
use std::time::Duration;

use airwatch_core::aqi::air_quality_index;
use airwatch_core::messages::{OutboundMessage, TelemetryMessage};
use tokio_util::sync::CancellationToken;

use crate::publish::PublishClient;
use crate::store::{TelemetryStore, ThresholdRegistry};

pub struct TelemetryPublisher {
    store: Arc<TelemetryStore>,
    registry: Arc<ThresholdRegistry>,
    publisher: Arc<PublishClient>,
    sensor_id: String,
    interval: Duration,
}

impl TelemetryPublisher {
    pub fn new(
        store: Arc<TelemetryStore>,
        registry: Arc<ThresholdRegistry>,
        publisher: Arc<PublishClient>,
        sensor_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            sensor_id: sensor_id.into(),
            interval,
        }
    }

    /// Build and publish one telemetry message. Returns the message when
    /// there was a sample to report, whether or not delivery succeeded.
    pub async fn tick(&self) -> Option<TelemetryMessage> {
        let sample = self.store.snapshot().await?;
        let thresholds = self.registry.snapshot().await;

        let aqi = air_quality_index(&sample.reading, &thresholds);
        let message = TelemetryMessage::new(&self.sensor_id, &sample.reading, aqi);

        let outbound = OutboundMessage::Telemetry(message.clone());
        match self.publisher.publish(&outbound).await {
            Ok(()) => tracing::debug!(aqi, "Telemetry published"),
            Err(e) => tracing::error!(
                aqi,
                status = e.status(),
                error = %e,
                "Failed to publish telemetry",
            ),
        }

        Some(message)
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Telemetry publisher started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Telemetry publisher stopped");
    }
}
