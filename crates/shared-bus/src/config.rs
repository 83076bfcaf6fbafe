//! # Bus Configuration
//!
//! Channel names and tuning knobs shared by publishers and consumers.

use crate::{DEFAULT_MAX_MESSAGES, DEFAULT_POLL_WAIT_MS, DEFAULT_RPC_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors surfaced by [`BusConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A batch-size knob is out of range.
    #[error("invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// A duration knob is out of range.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// A channel name is empty.
    #[error("invalid channel name: {0}")]
    InvalidChannelName(String),
}

/// Bus configuration.
///
/// `response_queue` is optional: without it the system still delivers
/// fire-and-forget events, but RPC-style calls fail fast with
/// [`crate::RpcError::ResponseQueueDisabled`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Broadcast topic all commands are published to.
    pub topic: String,
    /// Shared reply queue for RPC-style calls, if enabled.
    pub response_queue: Option<String>,
    /// Maximum messages drained per receive cycle.
    pub max_messages: usize,
    /// Long-poll wait on an empty queue, in milliseconds.
    pub poll_wait_ms: u64,
    /// Deadline for RPC-style calls, in milliseconds.
    pub rpc_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            topic: "beeline-topic".to_string(),
            response_queue: Some("beeline-response-queue".to_string()),
            max_messages: DEFAULT_MAX_MESSAGES,
            poll_wait_ms: DEFAULT_POLL_WAIT_MS,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
        }
    }
}

impl BusConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending knob.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.is_empty() {
            return Err(ConfigError::InvalidChannelName(
                "topic cannot be empty".into(),
            ));
        }
        if matches!(&self.response_queue, Some(name) if name.is_empty()) {
            return Err(ConfigError::InvalidChannelName(
                "response_queue cannot be empty when set".into(),
            ));
        }
        if self.max_messages == 0 {
            return Err(ConfigError::InvalidBatchSize(
                "max_messages cannot be 0".into(),
            ));
        }
        if self.poll_wait_ms == 0 {
            return Err(ConfigError::InvalidTimeout("poll_wait_ms cannot be 0".into()));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "rpc_timeout_ms cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Long-poll wait as a [`Duration`].
    #[must_use]
    pub fn poll_wait(&self) -> Duration {
        Duration::from_millis(self.poll_wait_ms)
    }

    /// RPC deadline as a [`Duration`].
    #[must_use]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}
