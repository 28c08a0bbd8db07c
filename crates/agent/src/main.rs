//! `airwatch-agent` -- environmental sensor telemetry daemon.
//!
//! Samples the air-quality sensor, raises hysteresis-gated alerts,
//! publishes telemetry and rollup summaries to the backend, and applies
//! threshold updates received over the control channel.
//!
//! # Environment variables
//!
//! See [`AgentSettings::from_env`] for the full list. The durable device
//! config (thresholds, token, channel) is the JSON file named by
//! `AIRWATCH_CONFIG`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airwatch_agent::alarm::{Alarm, CommandAlarm, LogAlarm};
use airwatch_agent::channel::{
    ControlChannel, Dispatcher, ThresholdListener, EVENT_QUEUE_CAPACITY,
};
use airwatch_agent::config::ConfigStore;
use airwatch_agent::publish::{
    build_http_client, DeviceIdentity, HttpTokenRefresher, HttpTransport, PublishClient,
};
use airwatch_agent::registration::ensure_registered;
use airwatch_agent::sensor::{FileSensor, RetryingSensor};
use airwatch_agent::settings::AgentSettings;
use airwatch_agent::store::{TelemetryStore, ThresholdRegistry};
use airwatch_agent::tasks::{AlertEvaluator, RollupAggregator, SensorPoller, TelemetryPublisher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let settings = AgentSettings::from_env();
    init_tracing(settings.json_logs);

    // --- Configuration ---
    let config = match ConfigStore::load(&settings.config_path).await {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "Cannot load device config");
            std::process::exit(1);
        }
    };

    let http = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build HTTP client");
            std::process::exit(1);
        }
    };

    // --- Registration ---
    let channel = match ensure_registered(&http, &config).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::error!(error = %e, "Device registration failed, aborting startup");
            std::process::exit(1);
        }
    };

    let device = config.snapshot().await;
    tracing::info!(
        sensor_id = %device.sensor_id,
        channel = %channel,
        config = %config.path().display(),
        "Starting airwatch-agent",
    );

    // --- Shared state ---
    let store = Arc::new(TelemetryStore::new());
    let registry = Arc::new(ThresholdRegistry::new(device.thresholds.clone()));

    let missing = registry.snapshot().await.missing_metrics();
    if !missing.is_empty() {
        tracing::warn!(
            ?missing,
            "No usable thresholds for some metrics; they will not be evaluated",
        );
    }

    // --- Publishing ---
    let transport = Arc::new(HttpTransport::new(
        http.clone(),
        &device.server_url,
        &channel,
        &device.sensor_id,
    ));
    let refresher = Arc::new(HttpTokenRefresher::new(
        http.clone(),
        &device.server_url,
        DeviceIdentity {
            certificate: device.certificate_string.clone(),
            sensor_id: device.sensor_id.clone(),
        },
    ));
    let publisher = Arc::new(PublishClient::new(
        transport,
        refresher,
        Arc::clone(&config),
        device.token.clone(),
    ));

    let alarm = build_alarm(device.alarm_command.as_deref());

    // --- Tasks ---
    let cancel = CancellationToken::new();
    let mut handles: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    let poller = SensorPoller::new(
        RetryingSensor::new(FileSensor::new(&settings.reading_path)),
        Arc::clone(&store),
        settings.poll_interval,
    );
    handles.push(("poller", tokio::spawn(poller.run(cancel.clone()))));

    let evaluator = AlertEvaluator::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        Arc::clone(&publisher),
        alarm,
        settings.evaluate_interval,
    )
    .with_alarm_repeat_count(device.alarm_repeat_count);
    handles.push(("evaluator", tokio::spawn(evaluator.run(cancel.clone()))));

    let telemetry = TelemetryPublisher::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        Arc::clone(&publisher),
        device.sensor_id.clone(),
        settings.telemetry_interval,
    );
    handles.push(("telemetry", tokio::spawn(telemetry.run(cancel.clone()))));

    let rollup = RollupAggregator::new(
        Arc::clone(&store),
        Arc::clone(&publisher),
        settings.rollup_window_ticks,
        settings.rollup_interval,
    );
    handles.push(("rollup", tokio::spawn(rollup.run(cancel.clone()))));

    match device.control_url.as_deref() {
        Some(control_url) => {
            let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

            let listener = ThresholdListener::new(Arc::clone(&registry), Arc::clone(&config));
            let dispatcher = Dispatcher::new(listener, Arc::clone(&publisher));
            handles.push((
                "dispatcher",
                tokio::spawn(dispatcher.run(events_rx, cancel.clone())),
            ));

            let control = ControlChannel::new(
                control_url,
                &channel,
                Arc::clone(&publisher),
                events_tx,
            );
            handles.push(("control", tokio::spawn(control.run(cancel.clone()))));
        }
        None => {
            tracing::warn!("No control-url configured; remote threshold updates are disabled");
        }
    }

    tracing::info!(tasks = handles.len(), "Agent running");

    // --- Shutdown ---
    shutdown_signal().await;
    cancel.cancel();

    for (name, handle) in handles {
        match tokio::time::timeout(settings.shutdown_grace, handle).await {
            Ok(Ok(())) => tracing::debug!(task = name, "Task stopped"),
            Ok(Err(e)) => tracing::error!(task = name, error = %e, "Task panicked"),
            Err(_) => tracing::warn!(task = name, "Task did not stop within grace period"),
        }
    }

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "airwatch_agent=info,airwatch_core=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Pick the buzzer command from config, falling back to log-only.
fn build_alarm(command: Option<&str>) -> Arc<dyn Alarm> {
    match command.map(CommandAlarm::new) {
        Some(Ok(alarm)) => Arc::new(alarm),
        Some(Err(e)) => {
            tracing::error!(error = %e, "Ignoring alarm command");
            Arc::new(LogAlarm)
        }
        None => Arc::new(LogAlarm),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
