// ABOUTME: AppError and ErrorCode, the single error type every server operation returns
// ABOUTME: The code alone decides the HTTP status and the `{"error":{code,message}}` body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Errors
//!
//! Handlers return [`AppResult`] and never choose status codes themselves: the
//! [`ErrorCode`] of the failing [`AppError`] is rendered through
//! [`ErrorCode::http_status`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable failure category, serialized as `SCREAMING_SNAKE_CASE`
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No bearer token or session cookie
    AuthRequired,
    /// Token, nonce, state or refresh token rejected
    AuthInvalid,
    /// Session token past its expiry
    AuthExpired,
    /// Resource belongs to another user
    PermissionDenied,

    /// Request body or query failed validation
    InvalidInput,
    /// Identifier or enum value could not be parsed
    InvalidFormat,
    /// Number outside its accepted bounds
    ValueOutOfRange,

    /// Missing or soft-deleted
    ResourceNotFound,
    /// Unique key taken
    ResourceAlreadyExists,
    /// Current state forbids the transition
    ResourceConflict,

    /// Neynar or a social platform answered with an error
    ExternalServiceError,
    /// Neynar or a social platform could not be reached
    ExternalServiceUnavailable,
    /// A platform rejected the app credentials or the user's grant
    ExternalAuthFailed,

    /// Required setting absent or invalid
    ConfigError,
    /// Anything not covered above
    InternalError,
    /// Query or connection failure
    DatabaseError,
    /// JSON encoding or decoding failure
    SerializationError,
}

impl ErrorCode {
    /// Status the error is rendered with
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::InvalidFormat | Self::ValueOutOfRange => 400,
            Self::AuthRequired | Self::AuthInvalid | Self::AuthExpired => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists | Self::ResourceConflict => 409,
            Self::ExternalServiceError | Self::ExternalAuthFailed => 502,
            Self::ExternalServiceUnavailable => 503,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError => 500,
        }
    }

    /// Wire name, as it appears in `error.code`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::AuthInvalid => "AUTH_INVALID",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceAlreadyExists => "RESOURCE_ALREADY_EXISTS",
            Self::ResourceConflict => "RESOURCE_CONFLICT",
            Self::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceUnavailable => "EXTERNAL_SERVICE_UNAVAILABLE",
            Self::ExternalAuthFailed => "EXTERNAL_AUTH_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of any server operation
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Category, decides the HTTP status
    pub code: ErrorCode,
    /// Shown to API clients as `error.message`
    pub message: String,
}

impl AppError {
    /// Error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// See [`ErrorCode::http_status`]
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Request carried no credentials
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Credentials or a one-time value were rejected
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Resource exists but belongs to someone else
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// `"{resource} not found"`
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(ErrorCode::ResourceNotFound, format!("{resource} not found"))
    }

    /// Unique key already taken
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// State machine forbids the requested transition
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceConflict, message)
    }

    /// Validation failure
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Number outside its bounds
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Unexpected failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Missing or invalid setting
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Upstream API error, reported as `"{service}: {message}"`
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::upstream(ErrorCode::ExternalServiceError, &service.into(), &message.into())
    }

    /// Upstream rejected our credentials, reported as `"{service}: {message}"`
    pub fn external_auth_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::upstream(ErrorCode::ExternalAuthFailed, &service.into(), &message.into())
    }

    fn upstream(code: ErrorCode, service: &str, message: &str) -> Self {
        Self::new(code, format!("{service}: {message}"))
    }
}

/// Result alias used across the server
pub type AppResult<T> = Result<T, AppError>;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always present
    pub error: ErrorResponseDetails,
}

/// `error` member of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// See [`ErrorCode`]
    pub code: ErrorCode,
    /// See [`AppError::message`]
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message.clone(),
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, format!("Invalid JSON: {error}"))
    }
}

impl From<uuid::Error> for AppError {
    fn from(error: uuid::Error) -> Self {
        Self::new(ErrorCode::InvalidFormat, format!("Invalid UUID: {error}"))
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("Record"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::already_exists(format!("Duplicate record: {db}"))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::invalid_input(format!("Referenced record does not exist: {db}"))
            }
            _ => Self::database(format!("Database operation failed: {error}")),
        }
    }
}

#[cfg(feature = "provider-errors")]
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        let code = if error.is_timeout() || error.is_connect() {
            ErrorCode::ExternalServiceUnavailable
        } else {
            ErrorCode::ExternalServiceError
        };
        Self::new(code, format!("External request failed: {error}"))
    }
}

#[cfg(feature = "http-response")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = %self.code, error = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, error = %self.message, "Request rejected");
        }

        (status, axum::Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), 401);
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ResourceConflict.http_status(), 409);
        assert_eq!(ErrorCode::ExternalAuthFailed.http_status(), 502);
        assert_eq!(ErrorCode::DatabaseError.http_status(), 500);
    }

    #[test]
    fn test_wire_names_match_serde() {
        for code in [
            ErrorCode::AuthRequired,
            ErrorCode::ValueOutOfRange,
            ErrorCode::ResourceAlreadyExists,
            ErrorCode::ExternalServiceUnavailable,
        ] {
            let serialized = serde_json::to_value(code).unwrap_or_default();
            assert_eq!(serialized, code.as_str());
        }
    }

    #[test]
    fn test_external_errors_name_the_service() {
        let error = AppError::external_auth_failed("x", "invalid_grant");
        assert_eq!(error.code, ErrorCode::ExternalAuthFailed);
        assert_eq!(error.message, "x: invalid_grant");
        assert_eq!(error.to_string(), "EXTERNAL_AUTH_FAILED: x: invalid_grant");
    }

    #[test]
    fn test_error_response_body() {
        let json = serde_json::to_value(ErrorResponse::from(&AppError::not_found("Post")))
            .unwrap_or_default();

        assert_eq!(json["error"]["code"], "RESOURCE_NOT_FOUND");
        assert_eq!(json["error"]["message"], "Post not found");
        assert_eq!(json["error"].as_object().map(serde_json::Map::len), Some(2));
    }
}
