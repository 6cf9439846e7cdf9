//! Error taxonomy for identity and profile operations

use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::auth::{jwt::JwtError, password::PasswordError};
use crate::store::StoreError;

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Malformed or rejected input, per field
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Credentials did not match; deliberately says nothing more
    #[error("Invalid email or password")]
    Authentication,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has already been used")]
    TokenAlreadyUsed,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Invalid token")]
    InvalidToken,

    /// Resource absent for reasons unrelated to authentication
    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        IdentityError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<ValidationErrors> for IdentityError {
    fn from(errors: ValidationErrors) -> Self {
        IdentityError::Validation(field_errors(&errors))
    }
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => {
                IdentityError::field(field, format!("A user with this {} already exists", field))
            }
            other => IdentityError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for IdentityError {
    fn from(err: PasswordError) -> Self {
        IdentityError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for IdentityError {
    fn from(err: JwtError) -> Self {
        IdentityError::Internal(err.to_string())
    }
}

/// Flattens `validator` errors into field errors, ordered by field name
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string()),
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}
