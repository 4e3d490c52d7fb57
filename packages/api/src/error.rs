// ABOUTME: API error type and its HTTP mapping
// ABOUTME: Maps store failures to status codes and machine-readable error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hill_core::JobStatus;
use hill_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Main application error type that all handlers return
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Structured error response format
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl ToString) -> Self {
        Self::Internal(msg.to_string())
    }

    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            AppError::ArtifactMissing(_) => (StatusCode::NOT_FOUND, "ARTIFACT_MISSING"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to return to clients
    fn to_user_message(&self) -> String {
        match self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => AppError::NotFound(id),
            StorageError::InvalidTransition { id, from, to } => {
                AppError::InvalidTransition { id, from, to }
            }
            StorageError::ArtifactMissing(reference) => AppError::ArtifactMissing(reference),
            StorageError::InvalidStatus(e) => AppError::Validation(e.to_string()),
            StorageError::InvalidInput(msg) => AppError::Validation(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();

        match &self {
            AppError::Internal(err) => {
                error!(
                    request_id = %request_id,
                    error = %err,
                    "Internal server error occurred"
                );
            }
            _ => {
                info!(
                    request_id = %request_id,
                    error_code = %error_code,
                    error = %self,
                    "API error response"
                );
            }
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code,
                message: self.to_user_message(),
            },
            request_id,
        };

        (status_code, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        let cases = [
            (
                AppError::from(StorageError::NotFound("job_1".to_string())),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                AppError::from(StorageError::InvalidTransition {
                    id: "job_1".to_string(),
                    from: JobStatus::Finished,
                    to: JobStatus::Cancelled,
                }),
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
            ),
            (
                AppError::from(StorageError::ArtifactMissing("job_1/output.tar.gz".to_string())),
                StatusCode::NOT_FOUND,
                "ARTIFACT_MISSING",
            ),
            (
                AppError::from(StorageError::InvalidInput("bad".to_string())),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::from(StorageError::Io(std::io::Error::other("disk full"))),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.to_status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_internal_message_is_sanitized() {
        let error = AppError::internal("failed to open /var/lib/hill/hill.db");
        let message = error.to_user_message();
        assert_eq!(message, "An internal server error occurred");
        assert!(!message.contains("hill.db"));
    }
}
