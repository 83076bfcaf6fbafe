//! # Message Envelopes
//!
//! Defines the wire shapes exchanged over the bus: the [`EventEnvelope`]
//! published to the broadcast topic and the [`ResponseEnvelope`] sent back
//! on the response queue.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Naming-convention marker identifying events that expect a correlated
/// reply. `REGISTER_USER_RPC` is RPC-style; `USER_REGISTERED_EVENT` is
/// fire-and-forget.
pub const RPC_MARKER: &str = "_RPC";

/// Transport-level success indicator carried by every response envelope.
///
/// No failure status exists at this layer: handler business failures travel
/// inside `data` as an `error` key.
pub const STATUS_OK: &str = "OK";

/// Opaque token matching an RPC reply to its caller.
///
/// Generated as a UUID v4 per call, but stored as a string: the wire format
/// is owned by whichever producer published the request, and consumers must
/// echo tokens they did not mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh correlation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for CorrelationId {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// The command envelope published to the broadcast topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Identifies the handler on the consuming side.
    pub event_type: String,
    /// Unique per in-flight call; echoed by RPC replies.
    pub correlation_id: CorrelationId,
    /// Arbitrary structured data for the handler.
    pub payload: Value,
}

impl EventEnvelope {
    /// Create an envelope with a freshly generated correlation ID.
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self::with_correlation_id(event_type, CorrelationId::new(), payload)
    }

    /// Create an envelope carrying an explicit correlation ID.
    #[must_use]
    pub fn with_correlation_id(
        event_type: impl Into<String>,
        correlation_id: CorrelationId,
        payload: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            correlation_id,
            payload,
        }
    }

    /// Whether this event expects a correlated reply, per the naming
    /// convention.
    #[must_use]
    pub fn is_rpc(&self) -> bool {
        self.event_type.contains(RPC_MARKER)
    }

    /// Parse an envelope from a raw queue message body.
    ///
    /// Topic fan-out wraps the envelope a second time as
    /// `{"Message": "<json-encoded envelope>"}` (the notification wrapper);
    /// messages sent straight to a queue arrive unwrapped. Both shapes are
    /// accepted transparently.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the body is not
    /// valid JSON or does not match the envelope shape.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let outer: Value = serde_json::from_str(body)?;
        if let Some(inner) = outer.get("Message").and_then(Value::as_str) {
            return serde_json::from_str(inner);
        }
        serde_json::from_value(outer)
    }

    /// Encode the envelope for transmission.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if encoding fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The reply envelope sent on the response queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echoes the request's correlation ID.
    pub correlation_id: CorrelationId,
    /// The handler's return value. May itself carry an `error` key for
    /// application-level failures.
    pub data: Value,
    /// Always [`STATUS_OK`] in this design.
    pub status: String,
}

impl ResponseEnvelope {
    /// Create a successful reply for the given correlation ID.
    #[must_use]
    pub fn ok(correlation_id: CorrelationId, data: Value) -> Self {
        Self {
            correlation_id,
            data,
            status: STATUS_OK.to_string(),
        }
    }

    /// Parse a reply from a raw response-queue message body.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] for undecodable bodies.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Encode the reply for transmission.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if encoding fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
