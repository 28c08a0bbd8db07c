//! Durable device configuration.
//!
//! [`DeviceConfig`] is the JSON document the agent reads at startup and
//! writes back whenever thresholds, the publish token, or the registered
//! channel change. [`ConfigStore`] serializes every write behind one mutex
//! so threshold updates and token refreshes never interleave, and writes
//! through a temp file plus rename so a crash cannot leave a truncated
//! config behind.

use std::path::{Path, PathBuf};

use airwatch_core::Thresholds;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Default number of buzzer repeats for a danger alert.
const DEFAULT_ALARM_REPEAT_COUNT: u32 = 3;

fn default_alarm_repeat_count() -> u32 {
    DEFAULT_ALARM_REPEAT_COUNT
}

/// Per-device configuration persisted across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceConfig {
    /// Backend base URL, e.g. `https://api.example.com`.
    pub server_url: String,
    /// Device certificate presented at registration and token refresh.
    pub certificate_string: String,
    pub sensor_id: String,
    /// Publish/control channel; `None` until the device is registered.
    #[serde(default)]
    pub channel_name: Option<String>,
    /// Current bearer token; `None` until the first refresh.
    #[serde(default)]
    pub token: Option<String>,
    /// WebSocket base URL of the control channel.
    #[serde(default)]
    pub control_url: Option<String>,
    /// Buzzer command run on danger alerts.
    #[serde(default)]
    pub alarm_command: Option<String>,
    #[serde(default = "default_alarm_repeat_count")]
    pub alarm_repeat_count: u32,
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Errors from loading or saving the device config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Owns the on-disk config and the in-memory copy.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: Mutex<DeviceConfig>,
}

impl ConfigStore {
    /// Read and parse the config file at `path`.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = tokio::fs::read(&path).await.map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self::new(path, config))
    }

    /// Wrap an already-loaded config. Nothing is written until an update.
    pub fn new(path: impl Into<PathBuf>, config: DeviceConfig) -> Self {
        Self {
            path: path.into(),
            current: Mutex::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current config.
    pub async fn snapshot(&self) -> DeviceConfig {
        self.current.lock().await.clone()
    }

    /// Apply `change` and persist the result.
    ///
    /// The in-memory copy is only updated once the write succeeded.
    pub async fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut DeviceConfig),
    {
        let mut current = self.current.lock().await;
        let mut next = current.clone();
        change(&mut next);
        self.write(&next).await?;
        *current = next;
        Ok(())
    }

    pub async fn update_thresholds(&self, thresholds: &Thresholds) -> Result<(), ConfigError> {
        self.update(|config| config.thresholds = thresholds.clone())
            .await
    }

    pub async fn update_token(&self, token: &str) -> Result<(), ConfigError> {
        self.update(|config| config.token = Some(token.to_string()))
            .await
    }

    pub async fn update_channel(&self, channel: &str) -> Result<(), ConfigError> {
        self.update(|config| config.channel_name = Some(channel.to_string()))
            .await
    }

    async fn write(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        let body = serde_json::to_vec_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|source| ConfigError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), "Device config saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
