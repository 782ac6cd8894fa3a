//! HTTP error mapping for request handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a request handler can surface to the client.
///
/// Moderation and generation failures never appear here; those degrade to
/// normal responses per the fail-open/fail-soft rules. This type covers the
/// genuinely request-terminating cases: bad input, missing authentication,
/// disabled features, and store/session faults.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No authenticated user in the server-side session.
    #[error("unauthorized")]
    Unauthorized,

    /// The request body or query was invalid.
    #[error("{0}")]
    BadRequest(String),

    /// A feature is disabled because its service is unconfigured.
    #[error("{0}")]
    Unavailable(String),

    /// Server-side session failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Document store failure.
    #[error("store error: {0}")]
    Store(#[from] docstore::StoreError),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Session(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
