//! Lock-guarded shared state.
//!
//! [`TelemetryStore`] holds the latest sensor sample and
//! [`ThresholdRegistry`] the current threshold set. These are the only
//! mutable values shared between tasks. Both are designed to be wrapped in
//! `Arc` and handed to each task's constructor; locks are held only for
//! the duration of a copy or a swap, never across I/O.

use std::sync::Arc;

use airwatch_core::{CoreError, Sample, Thresholds};
use tokio::sync::RwLock;

/// The single most recent sensor sample.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: RwLock<Option<Sample>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored sample.
    pub async fn write(&self, sample: Sample) {
        *self.latest.write().await = Some(sample);
    }

    /// Copy of the latest sample, or `None` before the first write.
    pub async fn snapshot(&self) -> Option<Sample> {
        *self.latest.read().await
    }
}

/// The current threshold set, replaced as a whole.
///
/// Readers receive an `Arc` to an immutable snapshot, so a reader can never
/// observe pairs from two different versions.
#[derive(Debug)]
pub struct ThresholdRegistry {
    current: RwLock<Arc<Thresholds>>,
}

impl ThresholdRegistry {
    /// Seed the registry. The initial set may be partial (e.g. loaded from an
    /// older config file); missing metrics are simply not evaluated. Invalid
    /// pairs are dropped and logged, so those metrics are not evaluated either.
    pub fn new(mut initial: Thresholds) -> Self {
        for e in initial.retain_valid() {
            tracing::error!(error = %e, "Ignoring configured threshold");
        }
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Swap in a complete threshold set.
    ///
    /// Incomplete or invalid sets are rejected and the previous set stays
    /// in effect.
    pub async fn replace(&self, thresholds: Thresholds) -> Result<(), CoreError> {
        thresholds.validate_complete()?;
        let next = Arc::new(thresholds);
        *self.current.write().await = next;
        Ok(())
    }

    pub async fn snapshot(&self) -> Arc<Thresholds> {
        Arc::clone(&*self.current.read().await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
