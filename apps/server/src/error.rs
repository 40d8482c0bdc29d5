//! Domain error types for the error log analysis server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::services::extraction::ExtractionDiagnostics;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request body exceeded the configured ceiling (bytes)
    #[error("Request body too large (limit: {0} bytes)")]
    PayloadTooLarge(usize),

    /// Too many analyses in flight
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Configured analyzer cannot be started
    #[error("Analyzer unavailable: {0}")]
    AnalyzerUnavailable(String),

    /// Local file operation failed
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// No structured result could be recovered from analyzer output
    #[error("Failed to extract a JSON result from analyzer output")]
    ExtractionFailed(Box<ExtractionDiagnostics>),
}

impl AppError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::AnalyzerUnavailable(_) => "ANALYZER_UNAVAILABLE",
            AppError::FileSystem(_) => "FILE_SYSTEM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::ExtractionFailed(_) => "EXTRACTION_FAILED",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::AnalyzerUnavailable(_)
            | AppError::FileSystem(_)
            | AppError::Internal(_)
            | AppError::ExtractionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            AppError::ExtractionFailed(diagnostics) => {
                tracing::error!(
                    stdout_length = diagnostics.stdout_length,
                    stderr_length = diagnostics.stderr_length,
                    has_json_start = diagnostics.has_json_start,
                    has_json_end = diagnostics.has_json_end,
                    "JSON extraction failed"
                );
                return HttpResponse::build(status).json(ExtractionErrorResponse {
                    success: false,
                    error: self.to_string(),
                    code: self.code().to_string(),
                    diagnostics: diagnostics.as_ref(),
                });
            }
            AppError::Database(err_str) => tracing::error!("Database error: {}", err_str),
            AppError::FileSystem(err_str) => tracing::error!("File system error: {}", err_str),
            AppError::Internal(err_str) => tracing::error!("Internal error: {}", err_str),
            AppError::AnalyzerUnavailable(err_str) => {
                tracing::error!("Analyzer unavailable: {}", err_str)
            }
            _ => {}
        }

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code().to_string(),
        })
    }
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human readable message.
    pub error: String,
    /// Machine readable error code.
    pub code: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.error)
    }
}

/// Error body for a failed extraction; diagnostics are flattened into the top level.
#[derive(Debug, Serialize)]
struct ExtractionErrorResponse<'a> {
    success: bool,
    error: String,
    code: String,
    #[serde(flatten)]
    diagnostics: &'a ExtractionDiagnostics,
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}
