//! Outbound delivery over HTTP.
//!
//! Alerts and telemetry are POSTed to the device's publish channel;
//! rollup summaries go to the per-device summary endpoint. Every request
//! carries the current bearer token. Authorization rejections are reported
//! as a distinct [`TransportError::Unauthorized`] so the publish client can
//! tell an expired token apart from any other failure.

use std::time::Duration;

use airwatch_core::messages::OutboundMessage;
use async_trait::async_trait;
use reqwest::StatusCode;

/// HTTP request timeout for a single delivery attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The backend rejected the credential (HTTP 401/403).
    #[error("Authorization rejected (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The backend returned any other non-2xx status.
    #[error("Publish returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized { .. })
    }

    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Unauthorized { status } | TransportError::Status { status, .. } => {
                Some(*status)
            }
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Delivers one outbound message using the given bearer token.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage, token: &str) -> Result<(), TransportError>;
}

/// Publishes to the backend REST API.
pub struct HttpTransport {
    client: reqwest::Client,
    server_url: String,
    channel: String,
    sensor_id: String,
}

impl HttpTransport {
    pub fn new(
        client: reqwest::Client,
        server_url: impl Into<String>,
        channel: impl Into<String>,
        sensor_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            channel: channel.into(),
            sensor_id: sensor_id.into(),
        }
    }

    fn publish_url(&self) -> String {
        format!("{}/channels/{}/publish", self.server_url, self.channel)
    }

    fn summary_url(&self) -> String {
        format!("{}/device/{}/summary", self.server_url, self.sensor_id)
    }
}

#[async_trait]
impl PublishTransport for HttpTransport {
    async fn deliver(&self, message: &OutboundMessage, token: &str) -> Result<(), TransportError> {
        let request = match message {
            OutboundMessage::Alert(alert) => self.client.post(self.publish_url()).json(alert),
            OutboundMessage::Telemetry(telemetry) => {
                self.client.post(self.publish_url()).json(telemetry)
            }
            OutboundMessage::Summary(summary) => {
                self.client.post(self.summary_url()).json(summary)
            }
        };

        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(kind = message.kind(), status = status.as_u16(), "Message delivered");
        Ok(())
    }
}

/// Build the shared HTTP client used for publishing and token refresh.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()
}
