//! Audible alarm trigger.
//!
//! The buzzer itself is driven by an external helper program. The agent
//! runs it with the repeat count as its only argument and never waits on
//! the outcome from the alerting path: callers spawn [`Alarm::alert`]
//! fire-and-forget.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Upper bound on a single buzzer run.
const DEFAULT_ALARM_TIMEOUT: Duration = Duration::from_secs(30);

/// Allowed command characters: alphanumeric, hyphen, underscore, dot, slash.
/// Prevents shell metacharacters sneaking in through the config file.
fn is_safe_command(command: &str) -> bool {
    !command.is_empty()
        && command.len() <= 256
        && command
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    #[error("Invalid alarm command: {0}")]
    InvalidCommand(String),

    #[error("Failed to execute alarm command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Alarm command exited with status {0}")]
    Failed(i32),

    #[error("Alarm command timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can sound an alarm.
#[async_trait]
pub trait Alarm: Send + Sync {
    async fn alert(&self, repeat_count: u32) -> Result<(), AlarmError>;
}

/// Runs an external buzzer helper.
#[derive(Debug)]
pub struct CommandAlarm {
    command: String,
    timeout: Duration,
}

impl CommandAlarm {
    pub fn new(command: impl Into<String>) -> Result<Self, AlarmError> {
        let command = command.into();
        if !is_safe_command(&command) {
            return Err(AlarmError::InvalidCommand(command));
        }
        Ok(Self {
            command,
            timeout: DEFAULT_ALARM_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Alarm for CommandAlarm {
    async fn alert(&self, repeat_count: u32) -> Result<(), AlarmError> {
        let start = std::time::Instant::now();
        tracing::info!(command = %self.command, repeat_count, "Sounding alarm");

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.command)
                .arg(repeat_count.to_string())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                tracing::debug!(elapsed_ms, "Alarm finished");
                Ok(())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(elapsed_ms, stderr = %stderr.trim(), "Alarm command failed");
                Err(AlarmError::Failed(output.status.code().unwrap_or(-1)))
            }
            Ok(Err(e)) => Err(AlarmError::Spawn(e)),
            Err(_) => Err(AlarmError::Timeout(self.timeout)),
        }
    }
}

/// Fallback used when no buzzer command is configured.
#[derive(Debug, Default)]
pub struct LogAlarm;

#[async_trait]
impl Alarm for LogAlarm {
    async fn alert(&self, repeat_count: u32) -> Result<(), AlarmError> {
        tracing::warn!(repeat_count, "Alarm triggered (no buzzer configured)");
        Ok(())
    }
}
