//! `/statistics` routes: read-only RPC queries against the statistics
//! worker, returning its reply data verbatim.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use statistics_service::{REGISTERED_LAST_24_RPC, TOTAL_UPDATES_RPC, TOTAL_USERS_RPC};

/// Routes owned by the statistics service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/statistics/total-users", get(total_users))
        .route("/statistics/total-updates", get(total_updates))
        .route("/statistics/registered-last-24h", get(registered_last_24h))
}

async fn total_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    query(&state, TOTAL_USERS_RPC).await
}

async fn total_updates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    query(&state, TOTAL_UPDATES_RPC).await
}

async fn registered_last_24h(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    query(&state, REGISTERED_LAST_24_RPC).await
}

async fn query(state: &AppState, event_type: &str) -> Result<Json<Value>, ApiError> {
    let reply = state.publisher.call_rpc(event_type, json!({})).await?;
    Ok(Json(reply.data))
}
