//! Publish token refresh against the registration backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token refresh returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token refresh response carried no token")]
    MissingToken,
}

/// Obtains a fresh bearer token for this device.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, RefreshError>;
}

/// Device identity sent to the registration backend.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceIdentity {
    #[serde(rename = "certification-string")]
    pub certificate: String,
    #[serde(rename = "sensor-id")]
    pub sensor_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Refreshes via `POST {server_url}/device/token`.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    server_url: String,
    identity: DeviceIdentity,
}

impl HttpTokenRefresher {
    pub fn new(
        client: reqwest::Client,
        server_url: impl Into<String>,
        identity: DeviceIdentity,
    ) -> Self {
        Self {
            client,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<String, RefreshError> {
        let response = self
            .client
            .post(format!("{}/device/token", self.server_url))
            .json(&self.identity)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        match body.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(RefreshError::MissingToken),
        }
    }
}
