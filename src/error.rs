//! Domain-specific error types for cobol-lens

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Main error type for the cobol-lens service
#[derive(Error, Debug)]
pub enum CobolLensError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Upload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Result store error: {message}")]
    Storage { message: String },
}

impl CobolLensError {
    pub fn validation(message: impl Into<String>) -> Self {
        CobolLensError::Validation {
            message: message.into(),
        }
    }
}

/// Convert CobolLensError to an HTTP response.
///
/// Client input errors carry their message back; everything else is logged
/// in full and answered with a generic 500.
impl IntoResponse for CobolLensError {
    fn into_response(self) -> Response {
        match self {
            CobolLensError::Validation { message } => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            CobolLensError::PayloadTooLarge { message } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": message })),
            )
                .into_response(),
            other => {
                tracing::error!("Processing error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal processing error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Result type alias for cobol-lens operations
pub type Result<T> = std::result::Result<T, CobolLensError>;
