//! # Shared Bus - Message Bus for Inter-Service Communication
//!
//! Services never call each other directly: the API gateway publishes
//! commands onto a broadcast topic, backend consumers process them, and
//! RPC-style commands are answered over a shared response queue.
//!
//! ## Request/Response over Broadcast
//!
//! ```text
//! ┌──────────────┐  publish(REGISTER_USER_RPC)   ┌──────────────┐
//! │  Publisher   │ ────────────────────────────→ │    Topic     │
//! │ (gateway)    │                               └──────┬───────┘
//! └──────▲───────┘                 fan-out   ┌──────────┴──────────┐
//!        │                                   ▼                     ▼
//!        │                           ┌──────────────┐      ┌──────────────┐
//!        │                           │ users-queue  │      │ stats-queue  │
//!        │                           └──────┬───────┘      └──────┬───────┘
//!        │                                  ▼                     ▼
//!        │                           ┌──────────────┐      ┌──────────────┐
//!        │  ResponseEnvelope         │  Consumer    │      │  Consumer    │
//!        └────────────────────────── │  (handlers)  │      │  (handlers)  │
//!            via response queue      └──────────────┘      └──────────────┘
//! ```
//!
//! The transport has no native request/reply primitive, so RPC is emulated:
//! every call carries a fresh [`CorrelationId`], callers park in the
//! [`PendingCallStore`], and a single [`ResponseDispatcher`] drains the
//! shared response queue and routes each reply to its waiting caller.
//!
//! ## Delivery Semantics
//!
//! **At-most-once, best-effort.** Consumers acknowledge every message they
//! receive - malformed bodies and handler failures included - trading
//! delivery guarantees for guaranteed forward progress. There is no retry
//! or redelivery path.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod config;
pub mod consumer;
pub mod envelope;
pub mod error;
pub mod pending;
pub mod publisher;
pub mod registry;

// Re-export main types
pub use broker::{DeliveredMessage, InMemoryBroker, MessageQueue, ReceiptHandle};
pub use config::{BusConfig, ConfigError};
pub use consumer::Consumer;
pub use envelope::{CorrelationId, EventEnvelope, ResponseEnvelope, RPC_MARKER, STATUS_OK};
pub use error::{BrokerError, HandlerError, PublishError, RpcError};
pub use pending::PendingCallStore;
pub use publisher::{Publisher, ResponseDispatcher, RpcReply};
pub use registry::HandlerRegistry;

/// Default maximum number of messages drained per receive cycle.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Default long-poll wait for an empty queue, in milliseconds.
pub const DEFAULT_POLL_WAIT_MS: u64 = 2_000;

/// Default deadline for an RPC-style call, in milliseconds.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;
