//! Error types for the Doc Portal server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::lifecycle::LifecycleError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Lifecycle(e) => match e {
                LifecycleError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found", "Document not found".to_string())
                }
                LifecycleError::InvalidArgument(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_argument", msg.clone())
                }
                LifecycleError::InvalidReference(path) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_reference",
                    format!("{} does not exist", path),
                ),
                LifecycleError::Store(e) => {
                    tracing::error!("Store error: {}", e);
                    internal("database_error", "Database error")
                }
            },
            AppError::Storage(e) => match e {
                StorageError::UnsupportedFileType(ext) => (
                    StatusCode::BAD_REQUEST,
                    "unsupported_file_type",
                    format!("Unsupported file type: {}", ext),
                ),
                StorageError::InvalidFileName(name) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_file_name",
                    format!("Invalid file name: {}", name),
                ),
                _ => {
                    tracing::error!("Storage error: {}", e);
                    internal("storage_error", "Storage error")
                }
            },
            AppError::Multipart(e) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                format!("Failed to read upload: {}", e),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                internal("database_error", "Database error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal("internal_error", "An internal error occurred")
            }
        }
    }
}

fn internal(error_type: &'static str, message: &str) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_type,
        message.to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
