use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::documents::DocumentError;
use crate::tasks::TaskError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The model answered but the answer was malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Every credential was tried and the last attempt failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timeout: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Transient(failure) if failure.is_timeout => AppError::Timeout(failure.reason),
            TaskError::Transient(failure) => AppError::Upstream(failure.reason),
            TaskError::Parse(failure) => AppError::Parse(failure.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Invalid multipart upload: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Document(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_ERROR",
                e.to_string(),
            ),
            AppError::Parse(msg) => {
                tracing::warn!("Parse error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PARSE_FAILURE",
                    msg.clone(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    msg.clone(),
                )
            }
            AppError::Timeout(msg) => {
                tracing::error!("Upstream timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::CallFailure;

    fn failure(is_timeout: bool) -> TaskError {
        TaskError::Transient(CallFailure {
            reason: "boom".to_string(),
            is_timeout,
            credential_index: 0,
        })
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let response = AppError::from(failure(true)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_transient_failure_maps_to_bad_gateway() {
        let response = AppError::from(failure(false)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_document_error_is_unprocessable() {
        let response = AppError::from(DocumentError::NoText).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
