use std::path::Path;
use std::time::Duration;

use netsdr_codec::{MessageType, MAX_SAMPLE_BITS};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{Result, SessionError};

/// Session behavior, typically loaded from a JSON file.
///
/// Missing fields fall back to [`SessionConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How long a command waits for its response, in milliseconds.
    pub command_timeout_ms: u64,
    /// Sample width in bits for DataItem0..DataItem3.
    pub sample_bits: [u16; 4],
    /// Pending command requests buffered ahead of the dispatcher.
    pub request_queue_capacity: usize,
    /// Data frames buffered between dispatcher and ingest. Frames beyond this
    /// are dropped, counted in `StreamStats::dropped` and show up downstream
    /// as sequence gaps.
    pub ingest_queue_capacity: usize,
    /// Notifications buffered for the sample consumer.
    pub notification_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 2_000,
            sample_bits: [16; 4],
            request_queue_capacity: 16,
            ingest_queue_capacity: 1024,
            notification_capacity: 1024,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Command timeout as a `Duration`.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Override the command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sample width configured for a data-item stream.
    pub fn sample_bits_for(&self, stream: MessageType) -> Option<u16> {
        stream
            .data_stream_index()
            .map(|index| self.sample_bits[index])
    }

    /// Override the sample width of one data-item stream.
    pub fn with_sample_bits(mut self, stream: MessageType, bits: u16) -> Self {
        if let Some(index) = stream.data_stream_index() {
            self.sample_bits[index] = bits;
        }
        self
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_ms == 0 {
            return Err(SessionError::Config(
                "command_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for (index, bits) in self.sample_bits.iter().enumerate() {
            if *bits == 0 || bits % 8 != 0 || *bits > MAX_SAMPLE_BITS {
                return Err(SessionError::Config(format!(
                    "sample_bits[{index}] = {bits}: must be a multiple of 8 between 8 and {MAX_SAMPLE_BITS}"
                )));
            }
        }

        for (name, value) in [
            ("request_queue_capacity", self.request_queue_capacity),
            ("ingest_queue_capacity", self.ingest_queue_capacity),
            ("notification_capacity", self.notification_capacity),
        ] {
            if value == 0 || value > Semaphore::MAX_PERMITS {
                return Err(SessionError::Config(format!(
                    "{name} must be between 1 and {}",
                    Semaphore::MAX_PERMITS
                )));
            }
        }

        Ok(())
    }
}
