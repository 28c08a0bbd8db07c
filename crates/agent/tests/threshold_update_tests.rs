//! Integration tests for remote threshold updates.
//!
//! Drives [`ThresholdListener`] and [`Dispatcher`] with raw control-channel
//! payloads and checks the registry, the persisted config, and the
//! access-denied refresh path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use airwatch_agent::channel::{
    ChannelEvent, ChannelStatus, Dispatcher, ThresholdListener, ThresholdUpdateError,
    UpdateOutcome,
};
use airwatch_agent::config::ConfigStore;
use airwatch_agent::store::ThresholdRegistry;
use airwatch_core::messages::{OutboundMessage, TelemetryMessage};
use airwatch_core::{CoreError, Metric, ThresholdPair};
use assert_matches::assert_matches;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{calm_reading, publisher, temp_config, thresholds, MockRefresher, MockTransport};

const FULL_UPDATE: &str = r#"{
    "request_type": "change_thresholds_level",
    "thresholds": {
        "temperature": {"warning": 26.0, "danger": 32.0},
        "humidity": {"warning": 55.0, "danger": 75.0},
        "co2": {"warning": 900.0, "danger": 1400.0},
        "pm25": {"warning": 30.0, "danger": 60.0}
    }
}"#;

fn listener() -> (tempfile::TempDir, Arc<ThresholdRegistry>, ThresholdListener) {
    let (dir, config) = temp_config();
    let registry = Arc::new(ThresholdRegistry::new(thresholds()));
    let listener = ThresholdListener::new(Arc::clone(&registry), config);
    (dir, registry, listener)
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[tokio::test]
async fn complete_update_is_applied_and_persisted() {
    let (dir, registry, listener) = listener();

    let outcome = listener.handle(FULL_UPDATE).await.unwrap();
    assert_matches!(outcome, UpdateOutcome::Applied(ref t) if t.len() == 4);

    let current = registry.snapshot().await;
    assert_eq!(current.get(Metric::Co2), Some(&ThresholdPair::new(900.0, 1400.0)));
    assert_eq!(current.get(Metric::Pm25), Some(&ThresholdPair::new(30.0, 60.0)));

    let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk["thresholds"]["co2"]["warning"], 900.0);
    assert_eq!(on_disk["thresholds"]["temperature"]["danger"], 32.0);
}

#[tokio::test]
async fn other_request_types_are_ignored() {
    let (_dir, registry, listener) = listener();

    let outcome = listener
        .handle(r#"{"request_type": "send_telemetry"}"#)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Ignored {
            request_type: "send_telemetry".into()
        }
    );
    assert_eq!(*registry.snapshot().await, thresholds());
}

#[tokio::test]
async fn incomplete_update_leaves_registry_unchanged() {
    let (_dir, registry, listener) = listener();
    let partial = r#"{
        "request_type": "change_thresholds_level",
        "thresholds": {"co2": {"warning": 900.0, "danger": 1400.0}}
    }"#;

    let err = listener.handle(partial).await.unwrap_err();

    assert_matches!(err, ThresholdUpdateError::Invalid(CoreError::MissingMetric(_)));
    assert_eq!(*registry.snapshot().await, thresholds());
}

#[tokio::test]
async fn inverted_pair_is_rejected() {
    let (_dir, registry, listener) = listener();
    let inverted = FULL_UPDATE.replace(
        r#""co2": {"warning": 900.0, "danger": 1400.0}"#,
        r#""co2": {"warning": 1400.0, "danger": 900.0}"#,
    );

    let err = listener.handle(&inverted).await.unwrap_err();

    assert_matches!(
        err,
        ThresholdUpdateError::Invalid(CoreError::InvertedThresholds { metric: Metric::Co2, .. })
    );
    assert_eq!(*registry.snapshot().await, thresholds());
}

#[tokio::test]
async fn unknown_metric_is_rejected() {
    let (_dir, _registry, listener) = listener();
    let unknown = FULL_UPDATE.replace("\"pm25\"", "\"ozone\"");

    let err = listener.handle(&unknown).await.unwrap_err();
    assert_matches!(
        err,
        ThresholdUpdateError::Invalid(CoreError::UnknownMetric(ref m)) if m == "ozone"
    );
}

#[tokio::test]
async fn malformed_or_empty_payloads_are_rejected() {
    let (_dir, registry, listener) = listener();

    assert_matches!(
        listener.handle("not json").await,
        Err(ThresholdUpdateError::Malformed(_))
    );
    assert_matches!(
        listener
            .handle(r#"{"request_type": "change_thresholds_level"}"#)
            .await,
        Err(ThresholdUpdateError::MissingThresholds)
    );
    assert_eq!(*registry.snapshot().await, thresholds());
}

// ---------------------------------------------------------------------------
// Startup thresholds
// ---------------------------------------------------------------------------

/// Pairs read from disk that break `warning < danger` are dropped when the
/// registry is seeded, so those metrics are skipped instead of misjudged.
#[tokio::test]
async fn invalid_pairs_in_saved_config_are_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let raw = json!({
        "server-url": "http://localhost:8080",
        "certificate-string": "cert",
        "sensor-id": "sensor-1",
        "thresholds": {
            "temperature": {"warning": 30.0, "danger": 30.0},
            "humidity": {"warning": 60.0, "danger": 80.0},
            "co2": {"warning": 1500.0, "danger": 800.0},
            "pm25": {"warning": 35.0, "danger": 75.0}
        }
    });
    std::fs::write(&path, raw.to_string()).unwrap();

    let config = ConfigStore::load(&path).await.unwrap();
    let registry = ThresholdRegistry::new(config.snapshot().await.thresholds);
    let current = registry.snapshot().await;

    assert!(current.get(Metric::Co2).is_none());
    assert!(current.get(Metric::Temperature).is_none());
    assert_eq!(current.get(Metric::Humidity), Some(&ThresholdPair::new(60.0, 80.0)));
    assert_eq!(current.missing_metrics(), vec![Metric::Temperature, Metric::Co2]);
}

// ---------------------------------------------------------------------------
// Registry atomicity
// ---------------------------------------------------------------------------

/// Readers racing a stream of replacements only ever see one of the two
/// complete sets, never a mix.
#[tokio::test]
async fn readers_never_observe_a_mixed_set() {
    let registry = Arc::new(ThresholdRegistry::new(thresholds()));
    let original = thresholds();
    let updated = original
        .iter()
        .map(|(metric, pair)| (metric, ThresholdPair::new(pair.warning + 1.0, pair.danger + 1.0)))
        .collect::<Vec<_>>();
    let updated = airwatch_core::Thresholds::from_pairs(updated);

    let writer = {
        let registry = Arc::clone(&registry);
        let (a, b) = (original.clone(), updated.clone());
        tokio::spawn(async move {
            for i in 0..200 {
                let next = if i % 2 == 0 { b.clone() } else { a.clone() };
                registry.replace(next).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let (a, b) = (original.clone(), updated.clone());
            tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = registry.snapshot().await;
                    assert!(*seen == a || *seen == b);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn denied(token: &str) -> ChannelEvent {
    ChannelEvent::Status(ChannelStatus::AccessDenied {
        status: 401,
        token: token.to_string(),
    })
}

#[tokio::test]
async fn dispatcher_routes_messages_to_listener() {
    let (_dir, config) = temp_config();
    let registry = Arc::new(ThresholdRegistry::new(thresholds()));
    let client = publisher(
        MockTransport::accepting("stale"),
        MockRefresher::issuing("fresh"),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::clone(&registry), config),
        client,
    );

    dispatcher
        .dispatch(ChannelEvent::Message(FULL_UPDATE.to_string()))
        .await;

    let current = registry.snapshot().await;
    assert_eq!(current.get(Metric::Humidity), Some(&ThresholdPair::new(55.0, 75.0)));
}

#[tokio::test]
async fn access_denied_triggers_a_token_refresh() {
    let (_dir, config) = temp_config();
    let registry = Arc::new(ThresholdRegistry::new(thresholds()));
    let refresher = MockRefresher::issuing("fresh");
    let client = publisher(
        MockTransport::accepting("fresh"),
        refresher.clone(),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::clone(&registry), Arc::clone(&config)),
        Arc::clone(&client),
    );

    dispatcher
        .dispatch(denied("stale"))
        .await;

    assert_eq!(refresher.calls(), 1);
    assert_eq!(client.token().await, "fresh");
    assert_eq!(config.snapshot().await.token.as_deref(), Some("fresh"));
}

/// A denial that arrives after a publish already replaced the refused token
/// reuses that refresh.
#[tokio::test]
async fn access_denied_after_publish_refresh_is_not_repeated() {
    let (_dir, config) = temp_config();
    let refresher = MockRefresher::slow("fresh", Duration::from_millis(50));
    let transport = MockTransport::accepting("fresh");
    let client = publisher(transport.clone(), refresher.clone(), Arc::clone(&config));
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::new(ThresholdRegistry::new(thresholds())), config),
        Arc::clone(&client),
    );

    let message =
        OutboundMessage::Telemetry(TelemetryMessage::new("sensor-1", &calm_reading(), 0));
    client.publish(&message).await.unwrap();
    dispatcher.dispatch(denied("stale")).await;

    assert_eq!(refresher.calls(), 1);
    assert_eq!(client.token().await, "fresh");
    assert_eq!(transport.delivered().len(), 1);
}

#[tokio::test]
async fn queued_denials_for_one_token_share_a_refresh() {
    let (_dir, config) = temp_config();
    let refresher = MockRefresher::slow("fresh", Duration::from_millis(50));
    let client = publisher(
        MockTransport::accepting("fresh"),
        refresher.clone(),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::new(ThresholdRegistry::new(thresholds())), config),
        client,
    );

    let (tx, rx) = mpsc::channel(8);
    for _ in 0..3 {
        tx.send(denied("stale")).await.unwrap();
    }
    drop(tx);
    dispatcher.run(rx, CancellationToken::new()).await;

    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn connectivity_statuses_do_not_refresh() {
    let (_dir, config) = temp_config();
    let refresher = MockRefresher::issuing("fresh");
    let client = publisher(
        MockTransport::accepting("stale"),
        refresher.clone(),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::new(ThresholdRegistry::new(thresholds())), config),
        client,
    );

    dispatcher
        .dispatch(ChannelEvent::Status(ChannelStatus::Connected))
        .await;
    dispatcher
        .dispatch(ChannelEvent::Status(ChannelStatus::Disconnected))
        .await;

    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn dispatcher_stops_on_cancel() {
    let (_dir, config) = temp_config();
    let client = publisher(
        MockTransport::accepting("stale"),
        MockRefresher::issuing("fresh"),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::new(ThresholdRegistry::new(thresholds())), config),
        client,
    );

    let (_tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(dispatcher.run(rx, cancel.clone()));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("dispatcher should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn dispatcher_stops_when_senders_drop() {
    let (_dir, config) = temp_config();
    let registry = Arc::new(ThresholdRegistry::new(thresholds()));
    let client = publisher(
        MockTransport::accepting("stale"),
        MockRefresher::issuing("fresh"),
        Arc::clone(&config),
    );
    let dispatcher = Dispatcher::new(
        ThresholdListener::new(Arc::clone(&registry), config),
        client,
    );

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(dispatcher.run(rx, CancellationToken::new()));

    tx.send(ChannelEvent::Message(FULL_UPDATE.to_string()))
        .await
        .unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("dispatcher should stop once the queue closes")
        .unwrap();

    let current = registry.snapshot().await;
    assert_eq!(current.get(Metric::Co2), Some(&ThresholdPair::new(900.0, 1400.0)));
}
