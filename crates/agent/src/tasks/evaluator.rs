//! Alert evaluation loop.
//!
//! Each tick pairs the latest sample with the current thresholds and runs
//! them through the hysteresis [`AlertTracker`]. New alerts are published;
//! danger alerts also sound the alarm without waiting for it. The tracker
//! lives only in this task, so transitions for one metric are totally
//! ordered and two alerts for the same metric can never race.

use std::sync::Arc;
use std::time::Duration;

use airwatch_core::alert::AlertLevel;
use airwatch_core::hysteresis::{AlertTracker, Evaluation};
use airwatch_core::messages::{AlertMessage, OutboundMessage};
use tokio_util::sync::CancellationToken;

use crate::alarm::Alarm;
use crate::publish::PublishClient;
use crate::store::{TelemetryStore, ThresholdRegistry};

pub struct AlertEvaluator {
    store: Arc<TelemetryStore>,
    registry: Arc<ThresholdRegistry>,
    publisher: Arc<PublishClient>,
    alarm: Arc<dyn Alarm>,
    alarm_repeat_count: u32,
    tracker: AlertTracker,
    interval: Duration,
}

impl AlertEvaluator {
    pub fn new(
        store: Arc<TelemetryStore>,
        registry: Arc<ThresholdRegistry>,
        publisher: Arc<PublishClient>,
        alarm: Arc<dyn Alarm>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            alarm,
            alarm_repeat_count: 3,
            tracker: AlertTracker::new(),
            interval,
        }
    }

    pub fn with_alarm_repeat_count(mut self, repeat_count: u32) -> Self {
        self.alarm_repeat_count = repeat_count;
        self
    }

    pub fn tracker(&self) -> &AlertTracker {
        &self.tracker
    }

    /// Evaluate the latest sample once. An empty store skips the tick.
    pub async fn tick(&mut self) -> Evaluation {
        let Some(sample) = self.store.snapshot().await else {
            tracing::debug!("No sample yet, skipping evaluation");
            return Evaluation::default();
        };
        let thresholds = self.registry.snapshot().await;

        let evaluation = self.tracker.evaluate(&sample, &thresholds);

        for metric in &evaluation.recovered {
            tracing::info!(
                metric = %metric,
                value = sample.reading.value(*metric),
                "Metric back to normal",
            );
        }

        for alert in &evaluation.alerts {
            tracing::warn!(
                metric = %alert.metric,
                level = alert.level.as_str(),
                severity = ?alert.severity(),
                value = alert.value,
                threshold = alert.threshold,
                "Threshold crossed",
            );

            if alert.level == AlertLevel::Danger {
                self.sound_alarm();
            }

            let message = OutboundMessage::Alert(AlertMessage::from(alert));
            if let Err(e) = self.publisher.publish(&message).await {
                tracing::error!(
                    metric = %alert.metric,
                    value = alert.value,
                    status = e.status(),
                    error = %e,
                    "Failed to publish alert",
                );
            }
        }

        evaluation
    }

    fn sound_alarm(&self) {
        let alarm = Arc::clone(&self.alarm);
        let repeat_count = self.alarm_repeat_count;
        tokio::spawn(async move {
            if let Err(e) = alarm.alert(repeat_count).await {
                tracing::error!(error = %e, "Alarm failed");
            }
        });
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Alert evaluator started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Alert evaluator stopped");
    }
}
