//! Gateway error type and its mapping from bus failures to status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared_bus::{PublishError, RpcError};

/// An HTTP-mappable failure.
///
/// The body shape is `{"detail": "..."}` for every error.
#[derive(Debug)]
pub struct ApiError {
    /// Status code returned to the client.
    pub status: StatusCode,
    /// Human-readable description.
    pub detail: String,
}

impl ApiError {
    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    /// 502 Bad Gateway: the backend never answered.
    #[must_use]
    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            detail: detail.into(),
        }
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"detail": self.detail}))).into_response()
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        match &err {
            // Misconfiguration, not a backend fault.
            RpcError::ResponseQueueDisabled => Self::internal(err.to_string()),
            RpcError::Publish(_) | RpcError::ChannelClosed { .. } | RpcError::Timeout { .. } => {
                Self::bad_gateway(err.to_string())
            }
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        Self::bad_gateway(err.to_string())
    }
}
