//! Request shapes for identity operations
//!
//! Missing JSON fields deserialize to empty values so they surface as
//! field-level validation errors rather than body parse failures.

use serde::Deserialize;
use validator::Validate;

use super::error::FieldError;
use crate::auth::password::validate_password_strength;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 255, message = "Full name must be between 1 and 255 characters"))]
    pub fullname: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    pub password: String,

    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginInput {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body of logout and refresh requests
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RefreshInput {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ForgotPasswordInput {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordInput {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    pub new_password: String,

    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    pub new_password: String,

    pub confirm_password: String,
}

/// Policy and confirmation checks for a new password
///
/// `user_attributes` are values the password must not equal (email local
/// part, full name).
pub fn new_password_errors(
    field: &str,
    password: &str,
    confirm: &str,
    user_attributes: &[&str],
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Err(message) = validate_password_strength(password, user_attributes) {
        errors.push(FieldError::new(field, message));
    }
    if password != confirm {
        errors.push(FieldError::new("confirm_password", "Passwords don't match"));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            fullname: String::new(),
            email: "not-an-email".to_string(),
            password: "river-stone-42".to_string(),
            confirm_password: "river-stone-42".to_string(),
        };

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("fullname"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_missing_fields_deserialize_empty() {
        let input: LoginInput = serde_json::from_str("{}").unwrap();

        assert!(input.email.is_empty());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_password_errors() {
        assert!(new_password_errors("password", "river-stone-42", "river-stone-42", &[]).is_empty());

        let errors = new_password_errors("new_password", "short", "other", &[]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "new_password");
        assert_eq!(errors[1].field, "confirm_password");
    }
}
