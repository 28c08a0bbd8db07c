//! Device registration at startup.
//!
//! A device without a channel registers itself with the backend, which
//! answers with the channel to publish and subscribe on. The channel is
//! saved so later starts skip this step. Registration failure is the one
//! fatal startup error.

use serde::Deserialize;

use crate::config::{ConfigError, ConfigStore};
use crate::publish::DeviceIdentity;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Device certification failed (HTTP {status})")]
    Rejected { status: u16 },

    #[error("Registration response carried no channel")]
    MissingChannel,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    channel: Option<String>,
}

/// Return the device channel, registering first if none is configured.
pub async fn ensure_registered(
    client: &reqwest::Client,
    config: &ConfigStore,
) -> Result<String, RegistrationError> {
    let current = config.snapshot().await;
    if let Some(channel) = current.channel_name {
        tracing::debug!(channel = %channel, "Device already registered");
        return Ok(channel);
    }

    let url = format!(
        "{}/device/register",
        current.server_url.trim_end_matches('/')
    );
    let identity = DeviceIdentity {
        certificate: current.certificate_string,
        sensor_id: current.sensor_id,
    };

    tracing::info!(url = %url, sensor_id = %identity.sensor_id, "Registering device");

    let response = client.post(&url).json(&identity).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RegistrationError::Rejected {
            status: status.as_u16(),
        });
    }

    let channel = response
        .json::<RegisterResponse>()
        .await?
        .channel
        .filter(|c| !c.is_empty())
        .ok_or(RegistrationError::MissingChannel)?;

    config.update_channel(&channel).await?;
    tracing::info!(channel = %channel, "Device registered");
    Ok(channel)
}
