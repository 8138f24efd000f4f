//! Error types for Planetdex services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Store-style validation error bodies
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Name of the model reported in validation bodies
const MODEL_NAME: &str = "Planet";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    ValidationError,
    InvalidUpdates,
    InvalidFormat,

    // Resource errors
    NotFound,

    // Database errors
    DatabaseError,
    ConnectionError,

    // External service errors
    UpstreamError,
    EnrichmentError,

    // Internal errors
    ConfigurationError,
}

/// A single failing path inside a [`ValidationFailure`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldError {
    /// A required path was missing or blank
    pub fn required(path: &str) -> Self {
        Self {
            kind: "required".to_string(),
            path: path.to_string(),
            message: format!("Path `{}` is required.", path),
            value: None,
        }
    }

    /// A path held a value that cannot be read as a string
    pub fn cast(path: &str, value: String) -> Self {
        Self {
            kind: "string".to_string(),
            path: path.to_string(),
            message: format!("Cast to string failed for value \"{}\" at path \"{}\"", value, path),
            value: Some(value),
        }
    }

    /// Another planet already uses this name
    pub fn unique(path: &str, value: &str) -> Self {
        Self {
            kind: "unique".to_string(),
            path: path.to_string(),
            message: format!("Error, expected `{}` to be unique. Value: `{}`", path, value),
            value: Some(value.to_string()),
        }
    }
}

/// Every field-level failure produced by one write attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    errors: BTreeMap<String, FieldError>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure carrying a single uniqueness violation on `name`
    pub fn duplicate_name(value: &str) -> Self {
        let mut failure = Self::new();
        failure.push(FieldError::unique("name", value));
        failure
    }

    /// Record a field error; the first error reported for a path wins
    pub fn push(&mut self, error: FieldError) {
        self.errors.entry(error.path.clone()).or_insert(error);
    }

    pub fn merge(&mut self, other: ValidationFailure) {
        for (_, error) in other.errors {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    /// Serialize into the store-style error object returned to clients
    pub fn to_body(&self) -> serde_json::Value {
        let errors: serde_json::Map<String, serde_json::Value> = self
            .errors
            .iter()
            .map(|(path, error)| {
                let mut entry = serde_json::json!({
                    "name": "ValidatorError",
                    "message": error.message,
                    "kind": error.kind,
                    "path": error.path,
                });
                if let Some(value) = &error.value {
                    entry["value"] = serde_json::Value::String(value.clone());
                }
                (path.clone(), entry)
            })
            .collect();

        serde_json::json!({
            "errors": errors,
            "_message": format!("{} validation failed", MODEL_NAME),
            "name": "ValidationError",
            "message": self.to_string(),
        })
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed", MODEL_NAME)?;
        for (index, error) in self.errors.values().enumerate() {
            let sep = if index == 0 { ": " } else { ", " };
            write!(f, "{}{}: {}", sep, error.path, error.message)?;
        }
        Ok(())
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("Invalid updates")]
    InvalidUpdates,

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Enrichment service error: {message}")]
    Enrichment { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Shorthand for a missing planet
    pub fn planet_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            resource_type: "planet".to_string(),
            id: id.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::InvalidUpdates => ErrorCode::InvalidUpdates,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Enrichment { .. } => ErrorCode::EnrichmentError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) |
            AppError::InvalidUpdates |
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Enrichment { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
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
}

/// Body returned when an update names fields outside the whitelist
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidUpdatesResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
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

        match self {
            AppError::Validation(failure) => (status, Json(failure.to_body())).into_response(),
            AppError::InvalidUpdates => (
                status,
                Json(InvalidUpdatesResponse { error: message }),
            )
                .into_response(),
            // Missing resources carry no body
            AppError::NotFound { .. } => status.into_response(),
            _ => {
                let body = ErrorResponse {
                    error: ErrorDetails { code, message },
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
