//! # Gateway HTTP Flows
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot`, with
//! the real workers running behind the bus: request validation, status-code
//! mapping, and the domain events the gateway emits after successful
//! writes.

// =============================================================================
// TEST HARNESS (only compiled during tests)
// =============================================================================

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use axum::body::Body;

#[cfg(test)]
use axum::http::{header, Request, StatusCode};

#[cfg(test)]
use axum::Router;

#[cfg(test)]
use node_runtime::wiring::{self, Topology};

#[cfg(test)]
use node_runtime::NodeConfig;

#[cfg(test)]
use statistics_service::StatisticsRepository;

#[cfg(test)]
use tokio::sync::watch;

#[cfg(test)]
use tower::ServiceExt;

#[cfg(test)]
struct Gateway {
    app: Router,
    statistics_repository: Arc<StatisticsRepository>,
    shutdown_tx: watch::Sender<bool>,
}

#[cfg(test)]
impl Gateway {
    fn launch() -> Self {
        Self::launch_with(wiring::test_config(), true)
    }

    fn launch_with(config: NodeConfig, run_workers: bool) -> Self {
        let topology = wiring::build(&config).expect("topology should build");
        let app = wiring::gateway_app(&topology);
        let Topology {
            response_dispatcher,
            users,
            statistics,
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
            app,
            statistics_repository,
            shutdown_tx,
        }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request should build");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should collect");
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, value)
    }
}

#[cfg(test)]
impl Drop for Gateway {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ada() -> serde_json::Value {
        json!({"name": "Ada", "surname": "Lovelace", "dni": "100", "address": "12 Crescent"})
    }

    #[tokio::test]
    async fn test_health() {
        let gateway = Gateway::launch();
        let (status, body) = gateway.request("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_register_returns_stored_user() {
        let gateway = Gateway::launch();

        let (status, body) = gateway
            .request("POST", "/users/register", Some(ada()))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("status"), Some(&json!("success")));
        let user = body.get("user").expect("reply should carry the user");
        assert_eq!(user.get("id"), Some(&json!(1)));
        assert_eq!(user.get("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn test_register_feeds_statistics_via_domain_event() {
        let gateway = Gateway::launch();
        gateway
            .request("POST", "/users/register", Some(ada()))
            .await;

        // The gateway broadcasts USER_REGISTERED_EVENT after replying; the
        // statistics worker picks it up asynchronously.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while gateway.statistics_repository.total_users() < 1 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "statistics never saw the registration"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let (status, body) = gateway.request("GET", "/statistics/total-users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"total_users": 1}));
    }

    #[tokio::test]
    async fn test_list_users_with_query_filter() {
        let gateway = Gateway::launch();
        gateway
            .request("POST", "/users/register", Some(ada()))
            .await;

        let (status, body) = gateway.request("GET", "/users?name=Ada", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("users").unwrap().as_array().unwrap().len(), 1);

        let (_, empty) = gateway.request("GET", "/users?name=Grace", None).await;
        assert!(empty.get("users").unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let gateway = Gateway::launch();
        let (status, body) = gateway
            .request("PUT", "/users/update", Some(json!({"name": "Ada"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.get("detail"), Some(&json!("Field 'id' is required")));
    }

    #[tokio::test]
    async fn test_update_unknown_user_maps_embedded_error_to_404() {
        let gateway = Gateway::launch();
        let (status, body) = gateway
            .request("PUT", "/users/update", Some(json!({"id": 42, "name": "X"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.get("detail"), Some(&json!("User not found")));
    }

    #[tokio::test]
    async fn test_update_existing_user() {
        let gateway = Gateway::launch();
        gateway
            .request("POST", "/users/register", Some(ada()))
            .await;

        let (status, body) = gateway
            .request(
                "PUT",
                "/users/update",
                Some(json!({"id": 1, "address": "1 Analytical Way"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.get("user").unwrap().get("address"),
            Some(&json!("1 Analytical Way"))
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while gateway.statistics_repository.total_updates() < 1 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "statistics never saw the update"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_unanswered_rpc_surfaces_as_bad_gateway() {
        // Workers never started: every RPC times out.
        let gateway = Gateway::launch_with(wiring::test_config(), false);

        let (status, body) = gateway.request("GET", "/statistics/total-users", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body
            .get("detail")
            .and_then(serde_json::Value::as_str)
            .unwrap()
            .contains("Timeout"));
    }

    #[tokio::test]
    async fn test_statistics_endpoints_zero_state() {
        let gateway = Gateway::launch();

        let (_, totals) = gateway.request("GET", "/statistics/total-users", None).await;
        assert_eq!(totals, json!({"total_users": 0}));

        let (_, updates) = gateway.request("GET", "/statistics/total-updates", None).await;
        assert_eq!(updates, json!({"total_updates": 0}));

        let (_, recent) = gateway
            .request("GET", "/statistics/registered-last-24h", None)
            .await;
        assert_eq!(recent, json!({"registered_last_24h": 0}));
    }
}
