//! Authentication endpoints
//!
//! - `POST /v1/auth/register` - Create an account and sign in
//! - `POST /v1/auth/login` - Sign in with email and password
//! - `POST /v1/auth/logout` - Revoke a refresh token (bearer)
//! - `POST /v1/auth/logout-all` - Revoke every refresh token of the caller (bearer)
//! - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
//! - `POST /v1/auth/forgot-password` - Start a password reset
//! - `POST /v1/auth/reset-password` - Finish a password reset
//! - `POST /v1/auth/change-password` - Change password (bearer)
//! - `GET /v1/auth/me` - Current user (bearer)

use super::MessageResponse;
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use legacyverse_shared::{
    auth::middleware::AuthContext,
    identity::{
        input::{
            ChangePasswordInput, ForgotPasswordInput, LoginInput, RefreshInput, RegisterInput,
            ResetPasswordInput,
        },
        AuthSession, ForgotPasswordOutcome,
    },
    models::user::PublicUser,
};
use serde::{Deserialize, Serialize};

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
    pub access: String,
    pub refresh: String,
}

/// Logout-all response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    pub message: String,

    /// Number of sessions that were still live
    pub revoked: u64,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access: String,
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "fullname": "John Doe",
///   "email": "john@example.com",
///   "password": "river-stone-42",
///   "confirm_password": "river-stone-42"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "message": "User registered successfully",
///   "user": { "id": "uuid", "email": "john@example.com", "username": "johndoe", ... },
///   "access": "eyJ...",
///   "refresh": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid fields, weak password, email taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let session = state.identity.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: session.user,
            access: session.access,
            refresh: session.refresh,
        }),
    ))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same response)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginInput>,
) -> ApiResult<Json<AuthSession>> {
    Ok(Json(state.identity.login(req).await?))
}

/// Logout endpoint
///
/// Revokes the given refresh token if it belongs to the caller. Logging out
/// twice with the same token succeeds.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RefreshInput>,
) -> ApiResult<Json<MessageResponse>> {
    state.identity.logout(&auth, req).await?;
    Ok(Json(MessageResponse::new("Logout successful")))
}

/// Signs the caller out on every device
pub async fn logout_all(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<LogoutAllResponse>> {
    let revoked = state.identity.logout_all(&auth).await?;
    Ok(Json(LogoutAllResponse {
        message: "Logged out from all sessions".to_string(),
        revoked,
    }))
}

/// Refresh token endpoint
///
/// The refresh token is not rotated.
///
/// # Errors
///
/// - `400 Bad Request` (`invalid_token`): Malformed, expired or revoked token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshInput>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = state.identity.refresh(req).await?;
    Ok(Json(RefreshResponse { access }))
}

/// Forgot password endpoint
///
/// Always answers with the same message. `token` is included only when
/// `AUTH_EXPOSE_RESET_TOKEN` is enabled and the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordInput>,
) -> ApiResult<Json<ForgotPasswordOutcome>> {
    Ok(Json(state.identity.forgot_password(req).await?))
}

/// Reset password endpoint
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Weak password or confirmation mismatch
/// - `400 Bad Request`: `token_expired`, `token_used` or `invalid_token`
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordInput>,
) -> ApiResult<Json<MessageResponse>> {
    state.identity.reset_password(req).await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}

/// Change password endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Current password is wrong
/// - `422 Unprocessable Entity`: Weak password or confirmation mismatch
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordInput>,
) -> ApiResult<Json<MessageResponse>> {
    state.identity.change_password(&auth, req).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<PublicUser>> {
    Ok(Json(state.identity.me(&auth).await?))
}
