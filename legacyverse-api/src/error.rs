//! Error handling for the API server
//!
//! Handlers return [`ApiResult`]; library errors convert into [`ApiError`]
//! with `?` and render as `{error, message, details?}` JSON bodies.
//!
//! # Example
//!
//! ```
//! use legacyverse_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::Value;
//!
//! async fn handler() -> ApiResult<Json<Value>> {
//!     Err(ApiError::NotFound("User not found".to_string()))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use legacyverse_shared::{
    auth::{jwt::JwtError, middleware::AuthError},
    identity::{FieldError, IdentityError},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<FieldError>),

    /// Rejected reset or refresh token (400), with a specific error code
    RejectedToken { code: &'static str, message: String },

    /// Internal server error (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RejectedToken { code, message } => write!(f, "{}: {}", code, message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::RejectedToken { code, message } => {
                (StatusCode::BAD_REQUEST, code, message, None)
            }
            ApiError::InternalError(msg) => {
                // Logged here, never sent to the client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(details) => ApiError::ValidationError(details),
            IdentityError::Authentication => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            IdentityError::TokenExpired => ApiError::RejectedToken {
                code: "token_expired",
                message: "Token has expired".to_string(),
            },
            IdentityError::TokenAlreadyUsed => ApiError::RejectedToken {
                code: "token_used",
                message: "Token has already been used".to_string(),
            },
            // Unknown and malformed tokens look the same from outside
            IdentityError::TokenNotFound | IdentityError::InvalidToken => ApiError::RejectedToken {
                code: "invalid_token",
                message: "Invalid or expired token".to_string(),
            },
            IdentityError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            IdentityError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized(
                "Authentication credentials were not provided".to_string(),
            ),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}
