//! # Publisher
//!
//! The producing side of the bus: fire-and-forget broadcast via
//! [`Publisher::publish`], and RPC emulation via [`Publisher::call_rpc`],
//! which parks the caller in the [`PendingCallStore`] until the
//! [`ResponseDispatcher`] routes the matching reply back.

use crate::broker::{InMemoryBroker, MessageQueue};
use crate::config::BusConfig;
use crate::envelope::{CorrelationId, EventEnvelope, ResponseEnvelope};
use crate::error::{PublishError, RpcError};
use crate::pending::PendingCallStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A correlated RPC reply as seen by the caller.
#[derive(Debug, Clone)]
pub struct RpcReply {
    /// The call's correlation ID.
    pub correlation_id: CorrelationId,
    /// The handler's return value; may embed an `error` key for
    /// application-level failures.
    pub data: Value,
    /// Transport status, always `"OK"`.
    pub status: String,
}

/// Publishes commands onto the broadcast topic.
pub struct Publisher {
    broker: Arc<InMemoryBroker>,
    topic: String,
    response_queue: Option<String>,
    pending: Arc<PendingCallStore>,
    rpc_timeout: Duration,
}

impl Publisher {
    /// Create a publisher for the configured topic.
    #[must_use]
    pub fn new(broker: Arc<InMemoryBroker>, config: &BusConfig) -> Self {
        Self {
            broker,
            topic: config.topic.clone(),
            response_queue: config.response_queue.clone(),
            pending: Arc::new(PendingCallStore::new(config.rpc_timeout())),
            rpc_timeout: config.rpc_timeout(),
        }
    }

    /// The pending-call store shared with the [`ResponseDispatcher`].
    #[must_use]
    pub fn pending(&self) -> Arc<PendingCallStore> {
        Arc::clone(&self.pending)
    }

    /// Fire-and-forget broadcast: one outbound message, no reply expected.
    ///
    /// # Errors
    ///
    /// [`PublishError::Transport`] when the broker refuses the message;
    /// logged here as well, since fire-and-forget callers commonly ignore
    /// the result.
    pub fn publish(&self, event_type: &str, payload: Value) -> Result<CorrelationId, PublishError> {
        let envelope = EventEnvelope::new(event_type, payload);
        let correlation_id = envelope.correlation_id.clone();
        self.transmit(&envelope)?;
        Ok(correlation_id)
    }

    /// Publish an RPC-style command and block this task until the matching
    /// reply arrives or the configured deadline passes.
    ///
    /// # Errors
    ///
    /// See [`Publisher::call_rpc_with_timeout`].
    pub async fn call_rpc(&self, event_type: &str, payload: Value) -> Result<RpcReply, RpcError> {
        self.call_rpc_with_timeout(event_type, payload, self.rpc_timeout)
            .await
    }

    /// [`Publisher::call_rpc`] with an explicit deadline.
    ///
    /// # Errors
    ///
    /// - [`RpcError::ResponseQueueDisabled`] when no response queue is
    ///   configured (fails fast rather than waiting for a reply that can
    ///   never arrive)
    /// - [`RpcError::Publish`] when the request never reached the topic
    /// - [`RpcError::Timeout`] when no matching reply arrived in time; the
    ///   correlation ID is retired, never reassigned to another call
    pub async fn call_rpc_with_timeout(
        &self,
        event_type: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<RpcReply, RpcError> {
        if self.response_queue.is_none() {
            return Err(RpcError::ResponseQueueDisabled);
        }

        // Register before publishing: the reply slot must exist by the time
        // any consumer can see the request.
        let (correlation_id, reply_rx) = self.pending.register(event_type, Some(timeout));
        let envelope =
            EventEnvelope::with_correlation_id(event_type, correlation_id.clone(), payload);

        if let Err(e) = self.transmit(&envelope) {
            self.pending.cancel(&correlation_id);
            return Err(e.into());
        }

        debug!(
            correlation_id = %correlation_id,
            event_type = event_type,
            "waiting for reply"
        );

        let started = Instant::now();
        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => {
                info!(
                    correlation_id = %correlation_id,
                    event_type = event_type,
                    "reply received"
                );
                Ok(RpcReply {
                    correlation_id,
                    data: reply.data,
                    status: reply.status,
                })
            }
            Ok(Err(_)) => Err(RpcError::ChannelClosed { correlation_id }),
            Err(_) => {
                self.pending.cancel(&correlation_id);
                let err = RpcError::Timeout {
                    correlation_id,
                    elapsed: started.elapsed(),
                };
                warn!(error = %err, event_type = event_type, "RPC call timed out");
                Err(err)
            }
        }
    }

    fn transmit(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let body = envelope.encode().map_err(PublishError::Encode)?;
        match self.broker.publish(&self.topic, &body) {
            Ok(receivers) => {
                info!(
                    correlation_id = %envelope.correlation_id,
                    event_type = envelope.event_type,
                    receivers = receivers,
                    "message published"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    correlation_id = %envelope.correlation_id,
                    event_type = envelope.event_type,
                    error = %e,
                    "error publishing message"
                );
                Err(e.into())
            }
        }
    }
}

/// Drains the shared response queue and routes each reply to its waiting
/// caller.
///
/// One dispatcher serves every concurrent `call_rpc` in the process, which
/// keeps the shared queue race-free: replies are matched through the
/// [`PendingCallStore`] instead of competing pollers, so a reply can never
/// be consumed by the wrong caller. Malformed bodies are acknowledged and
/// discarded immediately; replies with no live waiter are logged and
/// dropped.
pub struct ResponseDispatcher {
    queue: Arc<MessageQueue>,
    pending: Arc<PendingCallStore>,
    max_messages: usize,
    poll_wait: Duration,
}

impl ResponseDispatcher {
    /// Create a dispatcher over the given response queue.
    #[must_use]
    pub fn new(
        queue: Arc<MessageQueue>,
        pending: Arc<PendingCallStore>,
        config: &BusConfig,
    ) -> Self {
        Self {
            queue,
            pending,
            max_messages: config.max_messages,
            poll_wait: config.poll_wait(),
        }
    }

    /// Run until `shutdown` flips. Should be spawned as a background task.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.queue.name(), "response dispatcher started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(queue = %self.queue.name(), "response dispatcher stopped");
                    break;
                }
                batch = self.queue.receive(self.max_messages, self.poll_wait) => {
                    for message in batch {
                        self.route(&message.body);
                        self.queue.acknowledge(&message.receipt_handle);
                    }
                }
            }
        }
    }

    /// Drain whatever is currently on the response queue, once.
    pub async fn drain_once(&self) {
        let batch = self.queue.receive(self.max_messages, self.poll_wait).await;
        for message in batch {
            self.route(&message.body);
            self.queue.acknowledge(&message.receipt_handle);
        }
    }

    fn route(&self, body: &str) {
        match ResponseEnvelope::parse(body) {
            Ok(reply) => {
                // complete() logs the unknown-correlation case itself.
                let _ = self.pending.complete(reply);
            }
            Err(e) => {
                warn!(error = %e, "discarding malformed response message");
            }
        }
    }
}
