//! # API Gateway
//!
//! The HTTP-facing edge of the platform. Handlers are deliberately thin:
//! validate the request, publish the matching command over the shared bus,
//! await the correlated reply, and map the outcome to a status code.
//! Business logic lives behind the bus in the backend services.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Assemble the gateway router: service routes, health endpoint, CORS and
/// request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::users::router())
        .merge(routes::statistics::router())
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
