//! Threshold update handling.
//!
//! [`ThresholdListener`] is the only writer of the
//! [`ThresholdRegistry`]. A `change_thresholds_level` message carrying a
//! complete, valid mapping is persisted and then swapped in whole. Any
//! other request type is ignored; malformed or incomplete updates are
//! rejected and the previous thresholds stay authoritative.

use std::sync::Arc;

use airwatch_core::messages::ControlMessage;
use airwatch_core::{CoreError, Thresholds};

use crate::config::ConfigStore;
use crate::store::ThresholdRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ThresholdUpdateError {
    #[error("Malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Threshold update carried no thresholds")]
    MissingThresholds,

    #[error("Invalid threshold update: {0}")]
    Invalid(#[from] CoreError),
}

/// What happened to one control message.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied(Thresholds),
    /// Not a threshold change; nothing to do.
    Ignored { request_type: String },
}

pub struct ThresholdListener {
    registry: Arc<ThresholdRegistry>,
    config: Arc<ConfigStore>,
}

impl ThresholdListener {
    pub fn new(registry: Arc<ThresholdRegistry>, config: Arc<ConfigStore>) -> Self {
        Self { registry, config }
    }

    /// Handle one raw control-channel payload.
    pub async fn handle(&self, raw: &str) -> Result<UpdateOutcome, ThresholdUpdateError> {
        let message: ControlMessage = serde_json::from_str(raw)?;

        if !message.is_threshold_change() {
            return Ok(UpdateOutcome::Ignored {
                request_type: message.request_type,
            });
        }

        let raw_thresholds = message
            .thresholds
            .ok_or(ThresholdUpdateError::MissingThresholds)?;
        let thresholds = Thresholds::try_from(raw_thresholds)?;

        // A failed save still applies the update; it is only lost on restart.
        if let Err(e) = self.config.update_thresholds(&thresholds).await {
            tracing::error!(error = %e, "Failed to persist threshold update");
        }

        self.registry.replace(thresholds.clone()).await?;

        for (metric, pair) in thresholds.iter() {
            tracing::info!(
                metric = %metric,
                warning = pair.warning,
                danger = pair.danger,
                "Threshold updated",
            );
        }

        Ok(UpdateOutcome::Applied(thresholds))
    }
}
