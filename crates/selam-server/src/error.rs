use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use selam_shared::ValidationError;
use selam_store::StoreError;

use crate::notifier::NotifyError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid payload")]
    InvalidPayload,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) | ServerError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ServerError::BadRequest(_)
            | ServerError::Validation(_)
            | ServerError::InvalidPayload => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::BadGateway(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ServerError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

// Auth failures stay distinguishable from no-op reports; everything else is
// collapsed into one generic message for the scheduler.
impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NotifyError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            NotifyError::UpstreamQuery(_) | NotifyError::Internal(_) => {
                tracing::error!(error = %self, "Failed to send notification");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send notification")
            }
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
