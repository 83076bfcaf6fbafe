//! # End-to-End Bus Flows
//!
//! Exercises the full choreography through the publisher directly:
//!
//! ```text
//! call_rpc ──→ topic ──→ service queue ──→ worker ──→ response queue
//!     ▲                                                    │
//!     └──────────────── ResponseDispatcher ────────────────┘
//! ```

// =============================================================================
// TEST HARNESS (only compiled during tests)
// =============================================================================

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use node_runtime::wiring::{self, Topology};

#[cfg(test)]
use node_runtime::NodeConfig;

#[cfg(test)]
use shared_bus::Publisher;

#[cfg(test)]
use statistics_service::StatisticsRepository;

#[cfg(test)]
use tokio::sync::watch;

#[cfg(test)]
use users_service::UserRepository;

/// A whole platform instance running on background tasks. Workers stop when
/// the harness drops.
#[cfg(test)]
struct Platform {
    publisher: Arc<Publisher>,
    users_repository: Arc<UserRepository>,
    statistics_repository: Arc<StatisticsRepository>,
    shutdown_tx: watch::Sender<bool>,
}

#[cfg(test)]
impl Platform {
    fn launch() -> Self {
        Self::launch_with(wiring::test_config(), true)
    }

    /// `run_workers = false` leaves the consumers unstarted: requests are
    /// published but nothing ever replies.
    fn launch_with(config: NodeConfig, run_workers: bool) -> Self {
        let topology = wiring::build(&config).expect("topology should build");
        let Topology {
            publisher,
            response_dispatcher,
            users,
            statistics,
            users_repository,
            statistics_repository,
            ..
        } = topology;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if run_workers {
            let users_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                users.consumer.run(&users.registry, users_shutdown).await;
            });
            let statistics_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                statistics
                    .consumer
                    .run(&statistics.registry, statistics_shutdown)
                    .await;
            });
        }
        if let Some(dispatcher) = response_dispatcher {
            tokio::spawn(dispatcher.run(shutdown_rx));
        }

        Self {
            publisher,
            users_repository,
            statistics_repository,
            shutdown_tx,
        }
    }

    /// Wait until `predicate` holds or the deadline passes. Domain events
    /// propagate asynchronously, so assertions on counters need a window.
    async fn wait_for(&self, predicate: impl Fn(&Self) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !predicate(self) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached within 2s"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
impl Drop for Platform {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_bus::{RpcError, STATUS_OK};
    use statistics_service::{TOTAL_UPDATES_RPC, TOTAL_USERS_RPC};
    use users_service::{
        LIST_USERS_RPC, REGISTER_USER_RPC, UPDATE_USER_RPC, USER_REGISTERED_EVENT,
        USER_UPDATED_EVENT,
    };

    fn ada() -> serde_json::Value {
        json!({"name": "Ada", "surname": "Lovelace", "dni": "100", "address": "12 Crescent"})
    }

    #[tokio::test]
    async fn test_register_rpc_round_trip() {
        let platform = Platform::launch();

        let reply = platform
            .publisher
            .call_rpc(REGISTER_USER_RPC, ada())
            .await
            .expect("worker should reply in time");

        assert_eq!(reply.status, STATUS_OK);
        assert_eq!(reply.data.get("id"), Some(&json!(1)));
        assert_eq!(platform.users_repository.len(), 1);
    }

    #[tokio::test]
    async fn test_registration_event_feeds_statistics() {
        let platform = Platform::launch();

        let reply = platform
            .publisher
            .call_rpc(REGISTER_USER_RPC, ada())
            .await
            .unwrap();
        platform
            .publisher
            .publish(USER_REGISTERED_EVENT, reply.data)
            .unwrap();

        platform
            .wait_for(|p| p.statistics_repository.total_users() == 1)
            .await;

        let totals = platform
            .publisher
            .call_rpc(TOTAL_USERS_RPC, json!({}))
            .await
            .unwrap();
        assert_eq!(totals.data, json!({"total_users": 1}));
    }

    #[tokio::test]
    async fn test_update_flow_counts_updates() {
        let platform = Platform::launch();
        platform
            .publisher
            .call_rpc(REGISTER_USER_RPC, ada())
            .await
            .unwrap();

        let updated = platform
            .publisher
            .call_rpc(UPDATE_USER_RPC, json!({"id": 1, "address": "1 Analytical Way"}))
            .await
            .unwrap();
        assert_eq!(updated.data.get("address"), Some(&json!("1 Analytical Way")));

        platform
            .publisher
            .publish(USER_UPDATED_EVENT, updated.data)
            .unwrap();
        platform
            .wait_for(|p| p.statistics_repository.total_updates() == 1)
            .await;

        let totals = platform
            .publisher
            .call_rpc(TOTAL_UPDATES_RPC, json!({}))
            .await
            .unwrap();
        assert_eq!(totals.data, json!({"total_updates": 1}));
    }

    #[tokio::test]
    async fn test_update_missing_user_reports_error_in_data() {
        let platform = Platform::launch();

        let reply = platform
            .publisher
            .call_rpc(UPDATE_USER_RPC, json!({"id": 99}))
            .await
            .unwrap();

        // Transport succeeded; the failure is application-level.
        assert_eq!(reply.status, STATUS_OK);
        assert_eq!(reply.data, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn test_concurrent_rpcs_to_different_services() {
        let platform = Platform::launch();
        platform
            .publisher
            .call_rpc(REGISTER_USER_RPC, ada())
            .await
            .unwrap();

        // Two callers share the response queue; replies may interleave.
        let (users, totals) = tokio::join!(
            platform.publisher.call_rpc(LIST_USERS_RPC, json!({})),
            platform.publisher.call_rpc(TOTAL_USERS_RPC, json!({})),
        );

        let users = users.unwrap();
        assert_eq!(users.data.as_array().unwrap().len(), 1);
        let totals = totals.unwrap();
        assert!(totals.data.get("total_users").is_some());
    }

    #[tokio::test]
    async fn test_rpc_with_no_workers_times_out_in_about_two_seconds() {
        let mut config = wiring::test_config();
        config.bus.rpc_timeout_ms = 2_000;
        let platform = Platform::launch_with(config, false);

        let started = std::time::Instant::now();
        let result = platform
            .publisher
            .call_rpc(TOTAL_USERS_RPC, json!({}))
            .await;
        let elapsed = started.elapsed();

        let Err(err @ RpcError::Timeout { .. }) = result else {
            panic!("expected a timeout");
        };
        assert!(err.to_string().contains("Timeout"));
        assert!(elapsed >= Duration::from_millis(1_900), "returned too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "returned too late: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_foreign_events_are_skipped_by_both_workers() {
        let platform = Platform::launch();

        // Broadcast something nobody registered a handler for.
        platform
            .publisher
            .publish("SOMEONE_ELSES_EVENT", json!({"x": 1}))
            .unwrap();

        // The workers keep serving normally afterwards.
        let reply = platform
            .publisher
            .call_rpc(REGISTER_USER_RPC, ada())
            .await
            .unwrap();
        assert_eq!(reply.data.get("id"), Some(&json!(1)));
    }
}
