//! Sensor reading sources.
//!
//! The physical drivers run out of process and export their latest flat
//! reading as a JSON file. [`FileSensor`] reads that file; a file missing
//! any metric is rejected here rather than defaulted. [`RetryingSensor`]
//! applies the driver retry budget so that a transiently unavailable
//! reading only surfaces as an error once every attempt has failed.

use std::path::PathBuf;
use std::time::Duration;

use airwatch_core::Reading;
use async_trait::async_trait;

/// Driver retry budget: attempts before a read is reported as failed.
const DEFAULT_MAX_ATTEMPTS: u32 = 7;

/// Delay between driver retries.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Errors from a single sensor read.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor data not ready")]
    NotReady,

    #[error("Sensor I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed sensor reading: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Sensor read failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<SensorError> },
}

/// Something that produces one flat reading on demand.
#[async_trait]
pub trait SensorSource: Send {
    async fn read(&mut self) -> Result<Reading, SensorError>;
}

/// Reads the JSON reading exported by the driver process.
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SensorSource for FileSensor {
    async fn read(&mut self) -> Result<Reading, SensorError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SensorError::NotReady)
            }
            Err(e) => return Err(e.into()),
        };
        if raw.is_empty() {
            return Err(SensorError::NotReady);
        }
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Retries an inner source a bounded number of times.
pub struct RetryingSensor<S> {
    inner: S,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<S: SensorSource> RetryingSensor<S> {
    pub fn new(inner: S) -> Self {
        Self::with_budget(inner, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    pub fn with_budget(inner: S, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

#[async_trait]
impl<S: SensorSource> SensorSource for RetryingSensor<S> {
    async fn read(&mut self) -> Result<Reading, SensorError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.read().await {
                Ok(reading) => return Ok(reading),
                // A malformed reading will not fix itself on retry.
                Err(e @ SensorError::Malformed(_)) => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(SensorError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Sensor read failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
