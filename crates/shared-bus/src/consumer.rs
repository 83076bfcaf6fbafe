//! # Consumer Loop
//!
//! The consuming side of the bus: long-poll receive, dispatch by event
//! type, optional reply emission, acknowledgment.
//!
//! ## Processing Cycle
//!
//! ```text
//! IDLE ──→ RECEIVING ──(empty batch)──→ IDLE
//!              │
//!              └─(messages)──→ PROCESSING each ──→ ACKNOWLEDGING ──→ IDLE
//! ```
//!
//! Every received message is acknowledged, whatever happened to it: parse
//! failures, unregistered event types, and handler errors all still remove
//! the message. Forward progress over delivery guarantees - this is an
//! at-most-once model. Only the external shutdown signal ends the loop.

use crate::broker::{DeliveredMessage, MessageQueue};
use crate::config::BusConfig;
use crate::envelope::{CorrelationId, EventEnvelope, ResponseEnvelope};
use crate::registry::HandlerRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Processes one service's queue against its handler registry.
pub struct Consumer {
    queue: Arc<MessageQueue>,
    response_queue: Option<Arc<MessageQueue>>,
    max_messages: usize,
    poll_wait: Duration,
}

impl Consumer {
    /// Create a consumer for `queue`. Without a `response_queue`, RPC-style
    /// events are still processed but their replies are dropped with a
    /// warning.
    #[must_use]
    pub fn new(
        queue: Arc<MessageQueue>,
        response_queue: Option<Arc<MessageQueue>>,
        config: &BusConfig,
    ) -> Self {
        Self {
            queue,
            response_queue,
            max_messages: config.max_messages,
            poll_wait: config.poll_wait(),
        }
    }

    /// Perform one receive cycle: drain up to the configured batch size
    /// (waiting at most the long-poll window), process each message
    /// sequentially, and acknowledge every one of them.
    ///
    /// Processing failures never escape this method; the loop is designed
    /// to run forever under [`Consumer::run`].
    pub async fn consume(&self, handlers: &HandlerRegistry) {
        let batch = self.queue.receive(self.max_messages, self.poll_wait).await;
        for message in batch {
            self.process(handlers, &message).await;
            // Unconditional: at-most-once, forward progress guaranteed.
            self.queue.acknowledge(&message.receipt_handle);
        }
    }

    /// Repeat [`Consumer::consume`] until `shutdown` flips.
    pub async fn run(&self, handlers: &HandlerRegistry, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.queue.name(), "consumer started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(queue = %self.queue.name(), "consumer stopped");
                    break;
                }
                () = self.consume(handlers) => {}
            }
        }
    }

    async fn process(&self, handlers: &HandlerRegistry, message: &DeliveredMessage) {
        let envelope = match EventEnvelope::parse(&message.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(
                    queue = %self.queue.name(),
                    error = %e,
                    "discarding undecodable message"
                );
                return;
            }
        };

        info!(
            queue = %self.queue.name(),
            event_type = envelope.event_type,
            correlation_id = %envelope.correlation_id,
            "message received"
        );

        let is_rpc = envelope.is_rpc();
        match handlers.dispatch(&envelope.event_type, envelope.payload).await {
            None => {
                // Expected: the shared topic carries other services' events.
                debug!(
                    queue = %self.queue.name(),
                    event_type = envelope.event_type,
                    "no handler for event type"
                );
            }
            Some(Err(e)) => {
                // No reply is sent: an RPC caller observes a timeout rather
                // than an explicit failure.
                error!(
                    queue = %self.queue.name(),
                    event_type = envelope.event_type,
                    correlation_id = %envelope.correlation_id,
                    error = %e,
                    "handler failed"
                );
            }
            Some(Ok(data)) => {
                if is_rpc {
                    self.send_response(&envelope.correlation_id, data);
                }
            }
        }
    }

    fn send_response(&self, correlation_id: &CorrelationId, data: Value) {
        let Some(response_queue) = &self.response_queue else {
            warn!(
                correlation_id = %correlation_id,
                "no response queue configured, dropping reply"
            );
            return;
        };

        let reply = ResponseEnvelope::ok(correlation_id.clone(), data);
        match reply.encode() {
            Ok(body) => {
                response_queue.send(body);
                info!(correlation_id = %correlation_id, "response sent");
            }
            Err(e) => {
                error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "failed to encode response"
                );
            }
        }
    }
}
