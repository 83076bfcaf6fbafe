//! # Bus Error Taxonomy
//!
//! One error enum per concern. Transport and RPC failures always reach the
//! caller as values; nothing in this crate panics on a bad message.

use crate::envelope::CorrelationId;
use std::time::Duration;
use thiserror::Error;

/// Errors from the in-memory broker itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The named topic was never created.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The named queue was never created.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
}

/// Errors from a fire-and-forget publish.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The envelope could not be encoded for transmission.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// The broker refused the message.
    #[error("transport failure: {0}")]
    Transport(#[from] BrokerError),
}

/// Errors from an RPC-style call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No response queue is configured; RPC-style calls are disabled.
    /// Failing fast here beats blocking for a reply that can never arrive.
    #[error("no response queue configured")]
    ResponseQueueDisabled,

    /// The request never made it onto the topic.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The reply slot was dropped before a reply arrived.
    #[error("reply channel closed (correlation_id: {correlation_id})")]
    ChannelClosed {
        /// The call's correlation ID.
        correlation_id: CorrelationId,
    },

    /// No matching reply arrived before the deadline.
    #[error("Timeout after {elapsed:?} waiting for reply (correlation_id: {correlation_id})")]
    Timeout {
        /// The call's correlation ID. Never reused for another in-flight
        /// call.
        correlation_id: CorrelationId,
        /// How long the caller waited.
        elapsed: Duration,
    },
}

impl RpcError {
    /// The correlation ID of the failed call, when one was assigned.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::ChannelClosed { correlation_id } | Self::Timeout { correlation_id, .. } => {
                Some(correlation_id)
            }
            Self::ResponseQueueDisabled | Self::Publish(_) => None,
        }
    }
}

/// Errors raised by event handlers.
///
/// Handlers must return these rather than panic: the consumer loop logs the
/// failure, still acknowledges the message, and sends no reply (RPC callers
/// observe a timeout).
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not match the handler's expected shape.
    #[error("invalid payload for {event_type}: {source}")]
    InvalidPayload {
        /// The event type whose handler rejected the payload.
        event_type: String,
        /// The deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// Business-logic failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a business-logic failure from any printable message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
