use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings loaded from environment variables.
///
/// Everything here tunes the process; durable per-device values
/// (thresholds, token, channel) live in [`crate::config::DeviceConfig`].
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Path of the durable device config file.
    pub config_path: PathBuf,
    /// JSON reading file exported by the sensor driver.
    pub reading_path: PathBuf,
    /// Cadence of sensor polling into the telemetry store.
    pub poll_interval: Duration,
    /// Cadence of alert evaluation.
    pub evaluate_interval: Duration,
    /// Cadence of telemetry publishing.
    pub telemetry_interval: Duration,
    /// Cadence of rollup sampling.
    pub rollup_interval: Duration,
    /// Rollup samples per summary window.
    pub rollup_window_ticks: u32,
    /// How long each task gets to finish after shutdown is requested.
    pub shutdown_grace: Duration,
    /// Emit JSON log lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.json"),
            reading_path: PathBuf::from("/run/airwatch/reading.json"),
            poll_interval: Duration::from_millis(500),
            evaluate_interval: Duration::from_secs(5),
            telemetry_interval: Duration::from_secs(60),
            rollup_interval: Duration::from_secs(120),
            rollup_window_ticks: 6,
            shutdown_grace: Duration::from_secs(30),
            json_logs: false,
        }
    }
}

impl AgentSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                  | Default                      |
    /// |--------------------------|------------------------------|
    /// | `AIRWATCH_CONFIG`        | `config.json`                |
    /// | `SENSOR_READING_PATH`    | `/run/airwatch/reading.json` |
    /// | `POLL_INTERVAL_MS`       | `500`                        |
    /// | `EVALUATE_INTERVAL_SECS` | `5`                          |
    /// | `TELEMETRY_INTERVAL_SECS`| `60`                         |
    /// | `ROLLUP_INTERVAL_SECS`   | `120`                        |
    /// | `ROLLUP_WINDOW_TICKS`    | `6`                          |
    /// | `SHUTDOWN_GRACE_SECS`    | `30`                         |
    /// | `LOG_FORMAT`             | `text`                       |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            config_path: std::env::var("AIRWATCH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            reading_path: std::env::var("SENSOR_READING_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.reading_path),
            poll_interval: env_parse("POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            evaluate_interval: env_parse("EVALUATE_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.evaluate_interval),
            telemetry_interval: env_parse("TELEMETRY_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.telemetry_interval),
            rollup_interval: env_parse("ROLLUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rollup_interval),
            rollup_window_ticks: env_parse("ROLLUP_WINDOW_TICKS")
                .unwrap_or(defaults.rollup_window_ticks),
            shutdown_grace: env_parse("SHUTDOWN_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}
