//! Room hub and connection timing configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning for the room hub and per-connection pumps
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Seconds without a keepalive acknowledgement before a connection is dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds allowed for a single outbound frame write
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Capacity of each subscriber's outbound queue
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Largest inbound frame accepted, in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl HubConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Keepalive ping interval: nine tenths of the idle timeout, so a ping
    /// always lands before the peer's read deadline.
    pub fn ping_period(&self) -> Duration {
        self.idle_timeout() * 9 / 10
    }

    /// Time allowed for each join-code attempt.
    pub fn join_code_timeout(&self) -> Duration {
        self.idle_timeout()
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs < 2 {
            return Err(ValidationError::IdleTimeoutTooShort);
        }
        if self.write_timeout_secs == 0 || self.write_timeout_secs >= self.idle_timeout_secs {
            return Err(ValidationError::InvalidWriteTimeout);
        }
        if !(1..=65_536).contains(&self.outbound_capacity) {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.max_frame_bytes < 1024 {
            return Err(ValidationError::FrameSizeTooSmall);
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            write_timeout_secs: default_write_timeout(),
            outbound_capacity: default_outbound_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_write_timeout() -> u64 {
    10
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}
