//! Error handling for Armada Timer
//!
//! Centralized error type for the HTTP layer.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::station_registry::RegistryError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Registry(RegistryError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            AppError::Registry(RegistryError::InvalidHours(_)) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Registry(RegistryError::NotFound(_)) => "StationNotFound",
            AppError::Registry(RegistryError::AlreadyRunning(_)) => "StationAlreadyRunning",
            AppError::Registry(RegistryError::InvalidHours(_)) => "InvalidHours",
            AppError::Validation(_) => "ValidationError",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, code = self.error_code(), "request rejected");

        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().timestamp(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
