//! Error types for DeedLens services
//!
//! Provides:
//! - `AppError` for everything that can surface at a service boundary
//! - `ProviderError` for generation backend failures (recovered by the chain)
//! - `AuditError` for audit sink failures (always swallowed)
//! - HTTP status code mapping and structured error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidChunking,

    // Resource errors (4xxx)
    DocumentNotFound,

    // Store errors (7xxx)
    StoreError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidChunking => 1003,

            ErrorCode::DocumentNotFound => 4002,

            ErrorCode::StoreError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid chunking parameters: max_tokens={max_tokens}, overlap={overlap}")]
    InvalidChunking { max_tokens: usize, overlap: usize },

    // Resource errors
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // Store errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Document store error: {message}")]
    Store { message: String },

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidChunking { .. } => ErrorCode::InvalidChunking,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::Database(_) | AppError::Store { .. } => ErrorCode::StoreError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidChunking { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Store { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Failure of a single generation backend call.
///
/// Every variant is recoverable: the answer chain moves on to the next
/// backend. None of them escape the chain.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{backend}: timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    #[error("{backend}: request failed: {message}")]
    Network { backend: String, message: String },

    #[error("{backend}: API error {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("{backend}: empty response")]
    EmptyResponse { backend: String },

    #[error("{backend}: malformed response: {message}")]
    Malformed { backend: String, message: String },

    #[error("{backend}: API key not configured")]
    MissingApiKey { backend: String },
}

impl ProviderError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Network { .. } => "network",
            ProviderError::Status { .. } => "status",
            ProviderError::EmptyResponse { .. } => "empty",
            ProviderError::Malformed { .. } => "malformed",
            ProviderError::MissingApiKey { .. } => "auth",
        }
    }
}

/// Failure to forward a prompt/response pair to an audit sink
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit delivery failed: {0}")]
    Delivery(String),

    #[error("Audit sink rejected message with status {0}")]
    Rejected(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound { id: "10784".into() };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question must not be empty".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_chunking_is_client_error() {
        let err = AppError::InvalidChunking {
            max_tokens: 10,
            overlap: 10,
        };
        assert_eq!(err.code().as_code(), 1003);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_provider_error_kind() {
        let err = ProviderError::Timeout {
            backend: "ollama".into(),
            timeout_ms: 10_000,
        };
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.to_string(), "ollama: timed out after 10000ms");
    }
}
