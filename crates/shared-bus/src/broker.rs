//! # In-Memory Broker
//!
//! Single-node rendition of a broadcast topic fanning out to named queues.
//! Suitable for one-process deployments; a distributed setup would swap this
//! for a hosted broker behind the same surface.
//!
//! Queues follow the receive/acknowledge model: [`MessageQueue::receive`]
//! long-polls and moves messages in flight, [`MessageQueue::acknowledge`]
//! deletes them. In-flight messages whose visibility deadline lapses return
//! to the ready list, but the consumer loop acknowledges unconditionally, so
//! redelivery never happens in normal operation.

use crate::error::BrokerError;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// How long a received message stays invisible before returning to the
/// ready list unacknowledged.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle identifying one delivery of one message, required to acknowledge
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(Uuid);

impl ReceiptHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message handed to a receiver, pending acknowledgment.
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    /// Pass back to [`MessageQueue::acknowledge`] to delete the message.
    pub receipt_handle: ReceiptHandle,
    /// Raw message body.
    pub body: String,
}

struct InFlight {
    body: String,
    visible_at: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<String>,
    in_flight: HashMap<ReceiptHandle, InFlight>,
}

/// A named point-to-point queue with long-poll receive and explicit
/// acknowledgment.
pub struct MessageQueue {
    name: String,
    state: Mutex<QueueState>,
    notify: Notify,
    visibility: Duration,
}

impl MessageQueue {
    fn new(name: impl Into<String>, visibility: Duration) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            visibility,
        }
    }

    /// The queue's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a raw message body.
    pub fn send(&self, body: impl Into<String>) {
        {
            let mut state = self.state.lock();
            state.ready.push_back(body.into());
        }
        self.notify.notify_waiters();
    }

    /// Receive up to `max_messages`, waiting at most `wait` for the queue to
    /// become non-empty (long poll). Returns early as soon as anything is
    /// available; returns an empty batch once `wait` elapses.
    ///
    /// Received messages move in flight until acknowledged; they return to
    /// the ready list if the visibility deadline lapses first.
    pub async fn receive(&self, max_messages: usize, wait: Duration) -> Vec<DeliveredMessage> {
        let deadline = Instant::now() + wait;

        loop {
            // Register for wakeups before checking state: a send between the
            // check and the await would otherwise be missed.
            let notified = self.notify.notified();

            let batch = self.try_receive(max_messages);
            if !batch.is_empty() {
                return batch;
            }

            let now = Instant::now();
            if now >= deadline {
                return Vec::new();
            }
            let _ = tokio::time::timeout(deadline - now, notified).await;
        }
    }

    fn try_receive(&self, max_messages: usize) -> Vec<DeliveredMessage> {
        let mut state = self.state.lock();

        // Expired in-flight messages become visible again first.
        let now = Instant::now();
        let expired: Vec<ReceiptHandle> = state
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_at <= now)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in expired {
            if let Some(entry) = state.in_flight.remove(&handle) {
                debug!(queue = %self.name, receipt = %handle, "message visibility expired, requeueing");
                state.ready.push_front(entry.body);
            }
        }

        let count = max_messages.min(state.ready.len());
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(body) = state.ready.pop_front() else {
                break;
            };
            let receipt_handle = ReceiptHandle::new();
            state.in_flight.insert(
                receipt_handle,
                InFlight {
                    body: body.clone(),
                    visible_at: now + self.visibility,
                },
            );
            batch.push(DeliveredMessage {
                receipt_handle,
                body,
            });
        }
        batch
    }

    /// Delete a received message. Returns `false` when the receipt is
    /// unknown (already acknowledged or expired back to ready).
    pub fn acknowledge(&self, receipt_handle: &ReceiptHandle) -> bool {
        self.state.lock().in_flight.remove(receipt_handle).is_some()
    }

    /// Number of messages ready for delivery (excludes in-flight).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.lock().ready.len()
    }
}

/// In-memory broker owning the topics and queues of one deployment.
pub struct InMemoryBroker {
    topics: RwLock<HashMap<String, Vec<Arc<MessageQueue>>>>,
    queues: RwLock<HashMap<String, Arc<MessageQueue>>>,
    visibility: Duration,
}

impl InMemoryBroker {
    /// Create a broker with the default visibility timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_visibility(DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Create a broker whose queues use the given visibility timeout.
    #[must_use]
    pub fn with_visibility(visibility: Duration) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            queues: RwLock::new(HashMap::new()),
            visibility,
        }
    }

    /// Create a topic. Idempotent.
    pub fn create_topic(&self, name: &str) {
        self.topics.write().entry(name.to_string()).or_default();
    }

    /// Create a queue, or return the existing one with that name.
    pub fn create_queue(&self, name: &str) -> Arc<MessageQueue> {
        Arc::clone(
            self.queues
                .write()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MessageQueue::new(name, self.visibility))),
        )
    }

    /// Look up an existing queue.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownQueue`] when no queue with that name exists.
    pub fn queue(&self, name: &str) -> Result<Arc<MessageQueue>, BrokerError> {
        self.queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownQueue(name.to_string()))
    }

    /// Subscribe a queue to a topic: every message published to the topic is
    /// delivered to the queue, wrapped in the notification envelope.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownTopic`] / [`BrokerError::UnknownQueue`] when
    /// either side does not exist.
    pub fn subscribe(&self, topic: &str, queue_name: &str) -> Result<(), BrokerError> {
        let queue = self.queue(queue_name)?;
        let mut topics = self.topics.write();
        let subscribers = topics
            .get_mut(topic)
            .ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))?;
        subscribers.push(queue);
        debug!(topic = topic, queue = queue_name, "queue subscribed to topic");
        Ok(())
    }

    /// Publish a raw body to a topic, fanning one copy out to every
    /// subscribed queue. Returns the number of queues that received it;
    /// zero subscribers is not an error.
    ///
    /// Fan-out wraps the body as `{"Message": "<body>"}`, matching the
    /// notification shape consumers unwrap in [`crate::EventEnvelope::parse`].
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownTopic`] when the topic does not exist.
    pub fn publish(&self, topic: &str, body: &str) -> Result<usize, BrokerError> {
        let wrapped = serde_json::json!({ "Message": body }).to_string();

        let topics = self.topics.read();
        let subscribers = topics
            .get(topic)
            .ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))?;

        for queue in subscribers {
            queue.send(wrapped.clone());
        }
        if subscribers.is_empty() {
            debug!(topic = topic, "published to topic with no subscribers");
        }
        Ok(subscribers.len())
    }

    /// Send a raw body straight to a queue, bypassing topic fan-out and the
    /// notification wrapper. Used for response delivery.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownQueue`] when the queue does not exist.
    pub fn send_to_queue(&self, queue_name: &str, body: &str) -> Result<(), BrokerError> {
        self.queue(queue_name)?.send(body);
        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}
