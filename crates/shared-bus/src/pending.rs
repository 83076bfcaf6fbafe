//! # Pending Call Store
//!
//! Maps correlation IDs to callers blocked in `call_rpc`, bridging the
//! asynchronous response queue back to synchronous waiters.
//!
//! Flow:
//! 1. `call_rpc` calls [`PendingCallStore::register`] to get a reply slot
//! 2. The request is published with the returned correlation ID
//! 3. The response dispatcher drains the response queue and calls
//!    [`PendingCallStore::complete`]
//! 4. The caller awaits the slot or times out

use crate::envelope::{CorrelationId, ResponseEnvelope};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

struct PendingCall {
    /// Slot the reply is delivered into.
    sender: oneshot::Sender<ResponseEnvelope>,
    /// When the call was registered.
    created_at: Instant,
    /// Event type, for logging.
    event_type: String,
    /// Deadline for this call.
    timeout: Duration,
}

/// Concurrent store of in-flight RPC calls.
///
/// Every waiter registers *before* its request is published, so a reply can
/// never arrive ahead of its pending entry: replies whose correlation ID is
/// absent belong to callers that already timed out and are safe to drop.
pub struct PendingCallStore {
    pending: DashMap<CorrelationId, PendingCall>,
    default_timeout: Duration,
}

impl PendingCallStore {
    /// Create a store whose entries default to the given timeout.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
        }
    }

    /// Register a pending call and get the slot its reply will arrive on.
    pub fn register(
        &self,
        event_type: &str,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<ResponseEnvelope>) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            correlation_id.clone(),
            PendingCall {
                sender: tx,
                created_at: Instant::now(),
                event_type: event_type.to_string(),
                timeout: timeout.unwrap_or(self.default_timeout),
            },
        );

        debug!(
            correlation_id = %correlation_id,
            event_type = event_type,
            "registered pending call"
        );

        (correlation_id, rx)
    }

    /// Deliver a reply to its waiting caller.
    ///
    /// Returns `false` when no caller is waiting on the reply's correlation
    /// ID (expired or cancelled), or the waiter gave up between lookup and
    /// delivery.
    pub fn complete(&self, reply: ResponseEnvelope) -> bool {
        let Some((correlation_id, call)) = self.pending.remove(&reply.correlation_id) else {
            warn!(
                correlation_id = %reply.correlation_id,
                "reply for unknown or expired correlation ID"
            );
            return false;
        };

        let waited = call.created_at.elapsed();
        match call.sender.send(reply) {
            Ok(()) => {
                debug!(
                    correlation_id = %correlation_id,
                    event_type = call.event_type,
                    waited_ms = waited.as_millis() as u64,
                    "completed pending call"
                );
                true
            }
            Err(_) => {
                debug!(
                    correlation_id = %correlation_id,
                    event_type = call.event_type,
                    "pending call receiver dropped"
                );
                false
            }
        }
    }

    /// Remove a pending call without delivering anything. Returns whether an
    /// entry existed.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    /// Drop entries that outlived their own deadline. Returns how many were
    /// removed.
    ///
    /// `call_rpc` cancels its entry on timeout; this sweep only catches
    /// callers that were themselves dropped mid-wait.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.pending.len();
        self.pending.retain(|correlation_id, call| {
            let keep = now.duration_since(call.created_at) <= call.timeout;
            if !keep {
                warn!(
                    correlation_id = %correlation_id,
                    event_type = call.event_type,
                    "removing expired pending call"
                );
            }
            keep
        });
        before - self.pending.len()
    }

    /// Number of calls currently awaiting replies.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a call is still awaiting its reply.
    #[must_use]
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }
}

/// Background sweep for abandoned pending calls.
///
/// Spawn alongside the response dispatcher; exits when `shutdown` flips.
pub async fn sweep_expired(
    store: Arc<PendingCallStore>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let removed = store.remove_expired();
                if removed > 0 {
                    debug!(removed = removed, "swept expired pending calls");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_complete() {
        let store = PendingCallStore::new(Duration::from_secs(10));

        let (correlation_id, rx) = store.register("PING_RPC", None);
        assert!(store.is_pending(&correlation_id));
        assert_eq!(store.pending_count(), 1);

        let reply = ResponseEnvelope::ok(correlation_id.clone(), json!({"pong": true}));
        assert!(store.complete(reply));

        let received = rx.await.unwrap();
        assert_eq!(received.correlation_id, correlation_id);
        assert_eq!(received.data, json!({"pong": true}));
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_unknown_id_is_dropped() {
        let store = PendingCallStore::new(Duration::from_secs(10));
        let reply = ResponseEnvelope::ok(CorrelationId::from("nobody"), json!(null));
        assert!(!store.complete(reply));
    }

    #[tokio::test]
    async fn test_cancel() {
        let store = PendingCallStore::new(Duration::from_secs(10));
        let (correlation_id, _rx) = store.register("PING_RPC", None);

        assert!(store.cancel(&correlation_id));
        assert!(!store.is_pending(&correlation_id));
        assert!(!store.cancel(&correlation_id));
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let store = PendingCallStore::new(Duration::from_millis(10));
        let (_a, _rx_a) = store.register("PING_RPC", None);
        let (_b, _rx_b) = store.register("PING_RPC", Some(Duration::from_secs(60)));

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.remove_expired(), 1);
        assert_eq!(store.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_get_their_own_replies() {
        let store = Arc::new(PendingCallStore::new(Duration::from_secs(10)));

        let (id_a, rx_a) = store.register("A_RPC", None);
        let (id_b, rx_b) = store.register("B_RPC", None);

        // Replies arrive interleaved, B first.
        assert!(store.complete(ResponseEnvelope::ok(id_b.clone(), json!({"for": "b"}))));
        assert!(store.complete(ResponseEnvelope::ok(id_a.clone(), json!({"for": "a"}))));

        assert_eq!(rx_a.await.unwrap().data, json!({"for": "a"}));
        assert_eq!(rx_b.await.unwrap().data, json!({"for": "b"}));
    }
}
