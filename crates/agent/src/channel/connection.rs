//! WebSocket subscription to the device control channel.
//!
//! Connects to `{control_url}/channels/{channel}` with the current publish
//! token, forwards every text frame as [`ChannelEvent::Message`], and
//! reports connection health as [`ChannelEvent::Status`]. Dropped
//! connections are retried with exponential backoff until the
//! [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelEvent, ChannelStatus};
use crate::publish::PublishClient;

/// Wait between control-channel connection attempts.
///
/// The wait starts at `initial_delay` after a dropped or refused connection,
/// grows by `multiplier` per consecutive failure, and never exceeds
/// `max_delay`. A successful handshake resets it.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Wait to use after another failed attempt.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let grown_ms = (current.as_millis() as f64 * config.multiplier).round() as u64;
    config.max_delay.min(Duration::from_millis(grown_ms))
}

#[derive(Debug, thiserror::Error)]
enum ConnectError {
    #[error("Invalid control channel request: {0}")]
    Request(#[from] tungstenite::Error),

    #[error("Token is not a valid header value")]
    Header(#[from] tungstenite::http::header::InvalidHeaderValue),
}

/// Subscription task for one device channel.
pub struct ControlChannel {
    url: String,
    publisher: Arc<PublishClient>,
    events: mpsc::Sender<ChannelEvent>,
    reconnect: ReconnectConfig,
}

impl ControlChannel {
    pub fn new(
        control_url: &str,
        channel: &str,
        publisher: Arc<PublishClient>,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        Self {
            url: format!("{}/channels/{}", control_url.trim_end_matches('/'), channel),
            publisher,
            events,
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Keep the subscription alive until `cancel` fires or the dispatcher
    /// goes away.
    pub async fn run(self, cancel: CancellationToken) {
        let mut delay = self.reconnect.initial_delay;
        let mut attempt = 0u32;

        tracing::info!(url = %self.url, "Control channel started");

        loop {
            attempt += 1;
            let token = self.publisher.token().await;

            let request = match build_request(&self.url, &token) {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!(
                        url = %self.url,
                        error = %e,
                        "Cannot build control channel request",
                    );
                    return;
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = connect_async(request) => match result {
                    Ok((ws_stream, _response)) => {
                        tracing::info!(attempt, "Control channel connected");
                        attempt = 0;
                        delay = self.reconnect.initial_delay;
                        if !self.emit(ChannelEvent::Status(ChannelStatus::Connected)).await {
                            return;
                        }
                        self.run_session(ws_stream, &cancel).await;
                        if cancel.is_cancelled() {
                            break;
                        }
                        if !self.emit(ChannelEvent::Status(ChannelStatus::Disconnected)).await {
                            return;
                        }
                    }
                    Err(tungstenite::Error::Http(response))
                        if response.status() == StatusCode::UNAUTHORIZED
                            || response.status() == StatusCode::FORBIDDEN =>
                    {
                        let status = response.status().as_u16();
                        tracing::warn!(status, "Control channel rejected credential");
                        let denied = ChannelStatus::AccessDenied { status, token };
                        if !self.emit(ChannelEvent::Status(denied)).await {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "Control channel connection failed");
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, &self.reconnect);
        }

        tracing::info!("Control channel stopped");
    }

    /// Forward frames until the socket closes or `cancel` fires.
    async fn run_session<S>(
        &self,
        ws_stream: tokio_tungstenite::WebSocketStream<S>,
        cancel: &CancellationToken,
    )
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut sink, mut stream) = ws_stream.split();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.emit(ChannelEvent::Message(text.to_string())).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // Handled automatically by tungstenite.
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Backend closed control channel");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary frames are not part of the protocol.
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Control channel receive error");
                            break;
                        }
                        None => {
                            tracing::info!("Control channel stream exhausted");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Hand an event to the dispatcher. Returns `false` once it is gone.
    async fn emit(&self, event: ChannelEvent) -> bool {
        if self.events.send(event).await.is_err() {
            tracing::warn!("Dispatcher gone, stopping control channel");
            return false;
        }
        true
    }
}

fn build_request(
    url: &str,
    token: &str,
) -> Result<tungstenite::handshake::client::Request, ConnectError> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    Ok(request)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
