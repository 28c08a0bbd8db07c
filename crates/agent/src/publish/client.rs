//! Publish client with bounded token recovery.
//!
//! [`PublishClient::publish`] delivers with the current token. On an
//! authorization rejection it refreshes the token once and retries the
//! delivery once; a second rejection, a failed refresh, or any other
//! transport error is returned to the caller. There is no further retry,
//! so a backend that keeps rejecting the device cannot cause a loop.
//!
//! Refreshes are serialized: concurrent callers that all hit an expired
//! token perform a single refresh, and later callers reuse its result.

use std::sync::Arc;

use airwatch_core::messages::OutboundMessage;
use tokio::sync::{Mutex, RwLock};

use crate::config::ConfigStore;
use crate::publish::refresh::{RefreshError, TokenRefresher};
use crate::publish::transport::{PublishTransport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Delivery failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Token refresh failed after authorization error: {0}")]
    Refresh(#[from] RefreshError),
}

impl PublishError {
    /// HTTP status of the failure, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::Transport(e) => e.status(),
            PublishError::Refresh(RefreshError::Status { status, .. }) => Some(*status),
            PublishError::Refresh(_) => None,
        }
    }
}

/// Shared outbound client used by every publishing task.
pub struct PublishClient {
    transport: Arc<dyn PublishTransport>,
    refresher: Arc<dyn TokenRefresher>,
    config: Arc<ConfigStore>,
    token: RwLock<String>,
    refresh_lock: Mutex<()>,
}

impl PublishClient {
    pub fn new(
        transport: Arc<dyn PublishTransport>,
        refresher: Arc<dyn TokenRefresher>,
        config: Arc<ConfigStore>,
        initial_token: Option<String>,
    ) -> Self {
        Self {
            transport,
            refresher,
            config,
            token: RwLock::new(initial_token.unwrap_or_default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The token currently in use.
    pub async fn token(&self) -> String {
        self.token.read().await.clone()
    }

    /// Deliver `message`, refreshing the token at most once.
    pub async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        let token = self.token().await;

        match self.transport.deliver(message, &token).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(
                    kind = message.kind(),
                    status = e.status(),
                    "Publish rejected, refreshing token",
                );
                self.refresh_token(&token).await?;

                let token = self.token().await;
                self.transport.deliver(message, &token).await?;
                tracing::info!(kind = message.kind(), "Publish succeeded after token refresh");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `stale` with a fresh token and persist it.
    ///
    /// If another caller already replaced `stale` while this one waited for
    /// the refresh lock, no request is made.
    pub async fn refresh_token(&self, stale: &str) -> Result<(), RefreshError> {
        let _guard = self.refresh_lock.lock().await;

        if *self.token.read().await != stale {
            tracing::debug!("Token already refreshed by a concurrent caller");
            return Ok(());
        }

        let fresh = match self.refresher.refresh().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed");
                return Err(e);
            }
        };

        *self.token.write().await = fresh.clone();

        if let Err(e) = self.config.update_token(&fresh).await {
            tracing::error!(error = %e, "Refreshed token could not be persisted");
        }

        tracing::info!("Publish token refreshed");
        Ok(())
    }
}
