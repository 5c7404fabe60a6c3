use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Request-level error, converted to a structured JSON response at the
/// boundary. Internal error text never reaches the client on 5xx; it goes
/// to tracing instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input. Not retried.
    #[error("{0}")]
    Validation(String),

    /// The caller is not entitled to the resource (device mismatch).
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Caller should back off and retry after the window elapses.
    #[error("Too many requests")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after: u64,
    },

    /// The store or another dependency failed; safe for the caller to
    /// retry, since mutations are idempotent-by-key or constraint-guarded.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing secret or environment; fatal until an operator intervenes.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many activation attempts. Please try again later.".to_string(),
            ),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server misconfigured".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response =
            (status, Json(json!({ "success": false, "error": message }))).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_str(&retry_after.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("60")),
            );
        }

        crate::handlers::apply_cors(response)
    }
}
