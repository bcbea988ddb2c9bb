use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::access::DenyReason;
use crate::relay::RelayError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Streaming endpoints only use this before the stream starts; once the
/// relay is running, failures travel inside the event stream instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Access denied: {}", .0.as_str())]
    AccessDenied(DenyReason),

    #[error("LLM error: {0}")]
    Llm(#[from] RelayError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::AccessDenied(DenyReason::Unauthenticated) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required".to_string(),
            ),
            AppError::AccessDenied(DenyReason::ProRequired) => (
                StatusCode::PAYMENT_REQUIRED,
                "PRO_REQUIRED",
                "This feature requires a Pro plan or your own API key".to_string(),
            ),
            AppError::AccessDenied(DenyReason::LimitReached) => (
                StatusCode::PAYMENT_REQUIRED,
                "LIMIT_REACHED",
                "Monthly free usage limit reached".to_string(),
            ),
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
