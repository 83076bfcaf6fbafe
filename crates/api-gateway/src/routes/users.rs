//! `/users` routes.
//!
//! Each handler is an RPC call into the users worker. Successful writes
//! additionally broadcast a domain event for any interested service; those
//! publishes are fire-and-forget and their failures are only logged.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::warn;
use users_service::{
    UserCreate, UserFilter, LIST_USERS_RPC, REGISTER_USER_RPC, UPDATE_USER_RPC,
    USER_REGISTERED_EVENT, USER_UPDATED_EVENT,
};

/// Routes owned by the users service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_user))
        .route("/users", get(list_users))
        .route("/users/update", put(update_user))
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<Json<Value>, ApiError> {
    let payload =
        serde_json::to_value(payload).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let reply = state.publisher.call_rpc(REGISTER_USER_RPC, payload).await?;
    let user = reply.data;

    if let Err(e) = state.publisher.publish(USER_REGISTERED_EVENT, user.clone()) {
        warn!(error = %e, "failed to broadcast user registration");
    }

    Ok(Json(json!({"status": "success", "user": user})))
}

async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Value>, ApiError> {
    let payload =
        serde_json::to_value(filter).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let reply = state.publisher.call_rpc(LIST_USERS_RPC, payload).await?;
    Ok(Json(json!({"users": reply.data})))
}

async fn update_user(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if payload.get("id").is_none() {
        return Err(ApiError::bad_request("Field 'id' is required"));
    }

    let reply = state
        .publisher
        .call_rpc(UPDATE_USER_RPC, payload)
        .await?;
    let user = reply.data;

    // Business-level failure embedded in the reply data.
    if let Some(error) = user.get("error").and_then(Value::as_str) {
        return Err(ApiError::not_found(error.to_string()));
    }

    if let Err(e) = state.publisher.publish(USER_UPDATED_EVENT, user.clone()) {
        warn!(error = %e, "failed to broadcast user update");
    }

    Ok(Json(json!({"status": "success", "user": user})))
}
