//! Shared fixtures for agent integration tests.
//!
//! The mocks stand in for the HTTP backend so publishing, refresh and
//! threshold handling can be exercised without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airwatch_agent::config::{ConfigStore, DeviceConfig};
use airwatch_agent::publish::{
    PublishClient, PublishTransport, RefreshError, TokenRefresher, TransportError,
};
use airwatch_core::messages::OutboundMessage;
use airwatch_core::{Metric, Reading, Sample, ThresholdPair, Thresholds};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Domain fixtures
// ---------------------------------------------------------------------------

pub fn thresholds() -> Thresholds {
    Thresholds::from_pairs([
        (Metric::Temperature, ThresholdPair::new(28.0, 35.0)),
        (Metric::Humidity, ThresholdPair::new(60.0, 80.0)),
        (Metric::Co2, ThresholdPair::new(800.0, 1500.0)),
        (Metric::Pm25, ThresholdPair::new(35.0, 75.0)),
    ])
}

/// A reading below every warning threshold. Override single fields with
/// struct update syntax.
pub fn calm_reading() -> Reading {
    Reading {
        temperature: 22.0,
        humidity: 45.0,
        co2: 600,
        pm25: 10,
    }
}

/// A sample stamped `offset_secs` after a fixed base instant.
pub fn sample_at(reading: Reading, offset_secs: i64) -> Sample {
    let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Sample {
        reading,
        taken_at: base + chrono::Duration::seconds(offset_secs),
    }
}

pub fn device_config() -> DeviceConfig {
    DeviceConfig {
        server_url: "http://127.0.0.1:1".into(),
        certificate_string: "cert-abc".into(),
        sensor_id: "sensor-1".into(),
        channel_name: Some("chan-1".into()),
        token: Some("stale".into()),
        control_url: None,
        alarm_command: None,
        alarm_repeat_count: 3,
        thresholds: thresholds(),
    }
}

/// Config store backed by a file in a fresh temp dir. Keep the `TempDir`
/// alive for as long as the store is used.
pub fn temp_config() -> (TempDir, Arc<ConfigStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("config.json"), device_config());
    (dir, Arc::new(store))
}

// ---------------------------------------------------------------------------
// Transport mock
// ---------------------------------------------------------------------------

/// Accepts exactly one token; anything else is rejected as unauthorized.
/// Errors pushed with [`MockTransport::fail_next`] are returned first.
pub struct MockTransport {
    accepted: String,
    forced: Mutex<VecDeque<TransportError>>,
    deliveries: Mutex<Vec<(OutboundMessage, String)>>,
    attempts: AtomicUsize,
}

impl MockTransport {
    pub fn accepting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted: token.to_string(),
            forced: Mutex::new(VecDeque::new()),
            deliveries: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn fail_next(&self, error: TransportError) {
        self.forced.lock().unwrap().push_back(error);
    }

    /// Number of delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that were accepted, with the token they carried.
    pub fn delivered(&self) -> Vec<(OutboundMessage, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PublishTransport for MockTransport {
    async fn deliver(&self, message: &OutboundMessage, token: &str) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.forced.lock().unwrap().pop_front() {
            return Err(error);
        }
        if token != self.accepted {
            return Err(TransportError::Unauthorized { status: 401 });
        }

        self.deliveries
            .lock()
            .unwrap()
            .push((message.clone(), token.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Refresher mock
// ---------------------------------------------------------------------------

/// Hands out a fixed token (or a failure) and counts calls.
pub struct MockRefresher {
    token: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockRefresher {
    pub fn issuing(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(token: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for MockRefresher {
    async fn refresh(&self) -> Result<String, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => Err(RefreshError::Status {
                status: 403,
                body: "certificate revoked".into(),
            }),
        }
    }
}

/// Publish client starting from the token `"stale"`.
pub fn publisher(
    transport: Arc<MockTransport>,
    refresher: Arc<MockRefresher>,
    config: Arc<ConfigStore>,
) -> Arc<PublishClient> {
    Arc::new(PublishClient::new(
        transport,
        refresher,
        config,
        Some("stale".into()),
    ))
}
