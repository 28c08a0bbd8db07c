//! Single consumer of control-channel events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::listener::{ThresholdListener, UpdateOutcome};
use crate::channel::{ChannelEvent, ChannelStatus};
use crate::publish::PublishClient;

/// Routes data messages to the threshold listener and connection statuses
/// to the credential refresh path.
pub struct Dispatcher {
    listener: ThresholdListener,
    publisher: Arc<PublishClient>,
}

impl Dispatcher {
    pub fn new(listener: ThresholdListener, publisher: Arc<PublishClient>) -> Self {
        Self {
            listener,
            publisher,
        }
    }

    /// Consume events until `cancel` fires or every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<ChannelEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
            }
        }
        tracing::info!("Dispatcher stopped");
    }

    pub async fn dispatch(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(raw) => self.on_message(&raw).await,
            ChannelEvent::Status(status) => self.on_status(status).await,
        }
    }

    async fn on_message(&self, raw: &str) {
        match self.listener.handle(raw).await {
            Ok(UpdateOutcome::Applied(thresholds)) => {
                tracing::info!(metrics = thresholds.len(), "Threshold update applied");
            }
            Ok(UpdateOutcome::Ignored { request_type }) => {
                tracing::debug!(request_type = %request_type, "Ignoring control message");
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "Rejected control message");
            }
        }
    }

    async fn on_status(&self, status: ChannelStatus) {
        match status {
            ChannelStatus::Connected => tracing::info!("Control channel online"),
            ChannelStatus::Disconnected => tracing::warn!("Control channel offline"),
            ChannelStatus::AccessDenied { status, token } => {
                tracing::warn!(status, "Control channel access denied, refreshing token");
                // Keyed on the refused token so a refresh that already
                // replaced it is not repeated.
                if let Err(e) = self.publisher.refresh_token(&token).await {
                    tracing::error!(
                        status,
                        error = %e,
                        "Token refresh after access denial failed",
                    );
                }
            }
        }
    }
}
