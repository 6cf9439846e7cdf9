//! Account lifecycle operations
//!
//! Every operation that acts on behalf of a signed-in user takes the
//! caller's [`AuthContext`] as an argument. Notifications go out after the
//! store work has committed; a failed send is logged and never fails the
//! operation.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::error::{field_errors, IdentityError};
use super::input::{
    new_password_errors, ChangePasswordInput, ForgotPasswordInput, LoginInput, RefreshInput,
    RegisterInput, ResetPasswordInput,
};
use super::issuer::{SessionTokens, TokenIssuer};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{burn_verification, hash_password, verify_password};
use crate::auth::reset_token::validate_reset_token_format;
use crate::auth::username::derive_username;
use crate::clock::Clock;
use crate::models::user::{normalize_email, CreateUser, PublicUser, User};
use crate::notify::{Notification, Notifier};
use crate::store::{CredentialStore, StoreError};

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, password reset instructions have been sent.";

/// Attempts at deriving and inserting a username before giving up
const USERNAME_ATTEMPTS: usize = 3;

/// Tunables for token lifetimes and account policy
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,

    /// Base URL of the web app; reset links point at `{frontend_url}/reset-password`
    pub frontend_url: String,

    /// Return the reset token in the forgot-password response (development only)
    pub expose_reset_token: bool,

    pub revoke_sessions_on_password_change: bool,
}

impl IdentitySettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::minutes(60),
            refresh_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::minutes(60),
            frontend_url: "http://localhost:3000".to_string(),
            expose_reset_token: false,
            revoke_sessions_on_password_change: true,
        }
    }
}

/// Signed-in user plus a fresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub access: String,
    pub refresh: String,
}

impl AuthSession {
    fn new(user: &User, tokens: SessionTokens) -> Self {
        Self {
            user: PublicUser::from(user),
            access: tokens.access,
            refresh: tokens.refresh,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordOutcome {
    pub message: String,

    /// Present only when reset tokens are exposed and the email exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    tokens: TokenIssuer,
    settings: IdentitySettings,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: IdentitySettings,
    ) -> Self {
        let tokens = TokenIssuer::new(
            store.clone(),
            clock.clone(),
            settings.jwt_secret.clone(),
            settings.access_token_ttl,
            settings.refresh_token_ttl,
            settings.reset_token_ttl,
        );

        Self {
            store,
            notifier,
            clock,
            tokens,
            settings,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn settings(&self) -> &IdentitySettings {
        &self.settings
    }

    /// Creates an account with its empty profile and signs it in
    pub async fn register(&self, mut input: RegisterInput) -> Result<AuthSession, IdentityError> {
        input.email = input.email.trim().to_string();
        input.fullname = input.fullname.trim().to_string();

        let mut errors = input.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
        let email = normalize_email(&input.email);
        let local_part = email.split('@').next().unwrap_or_default().to_string();
        errors.extend(new_password_errors(
            "password",
            &input.password,
            &input.confirm_password,
            &[local_part.as_str(), input.fullname.as_str()],
        ));
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(IdentityError::field("email", "A user with this email already exists"));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self.create_user(&email, &input.fullname, password_hash).await?;
        let tokens = self.tokens.issue_session(user.id).await?;

        info!(user_id = %user.id, username = %user.username, "User registered");

        self.notify(Notification::Welcome {
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            username: user.username.clone(),
        })
        .await;

        Ok(AuthSession::new(&user, tokens))
    }

    /// Inserts the user, re-deriving the username when a concurrent
    /// registration claimed it first
    async fn create_user(
        &self,
        email: &str,
        fullname: &str,
        password_hash: String,
    ) -> Result<User, IdentityError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let username = derive_username(self.store.as_ref(), fullname).await?;

            let result = self
                .store
                .create_user_with_profile(CreateUser {
                    email: email.to_string(),
                    fullname: fullname.to_string(),
                    username: username.clone(),
                    password_hash: password_hash.clone(),
                })
                .await;

            match result {
                Ok((user, _profile)) => return Ok(user),
                Err(StoreError::Duplicate("username")) if attempt < USERNAME_ATTEMPTS => {
                    warn!(username = %username, attempt, "Username taken during registration, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Signs in with email and password
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, mut input: LoginInput) -> Result<AuthSession, IdentityError> {
        input.email = input.email.trim().to_string();
        input.validate()?;

        let Some(user) = self.store.find_user_by_email(&input.email).await? else {
            burn_verification(&input.password);
            warn!("Login failed: unknown email");
            return Err(IdentityError::Authentication);
        };

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(IdentityError::Authentication);
        }

        let tokens = self.tokens.issue_session(user.id).await?;
        info!(user_id = %user.id, "User logged in");

        Ok(AuthSession::new(&user, tokens))
    }

    /// Revokes one of the caller's refresh tokens
    pub async fn logout(&self, caller: &AuthContext, input: RefreshInput) -> Result<(), IdentityError> {
        input.validate()?;
        self.tokens.revoke_owned(caller, &input.refresh).await?;

        info!(user_id = %caller.user_id, "User logged out");
        Ok(())
    }

    /// Revokes every refresh token of the caller, signing out all devices
    pub async fn logout_all(&self, caller: &AuthContext) -> Result<u64, IdentityError> {
        let revoked = self.tokens.revoke_all(caller.user_id).await?;

        info!(user_id = %caller.user_id, revoked, "User logged out everywhere");
        Ok(revoked)
    }

    /// Mints a new access token from a live refresh token
    pub async fn refresh(&self, input: RefreshInput) -> Result<String, IdentityError> {
        input.validate()?;
        self.tokens.refresh_session(&input.refresh).await
    }

    /// Starts a password reset
    ///
    /// The response is the same whether or not the email is registered.
    pub async fn forgot_password(
        &self,
        mut input: ForgotPasswordInput,
    ) -> Result<ForgotPasswordOutcome, IdentityError> {
        input.email = input.email.trim().to_string();
        input.validate()?;

        let mut outcome = ForgotPasswordOutcome {
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
            token: None,
        };

        let Some(user) = self.store.find_user_by_email(&input.email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(outcome);
        };

        let token = self.tokens.issue_reset_token(user.id).await?;

        self.notify(Notification::PasswordReset {
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            reset_url: self.reset_url(&token),
            expires_in_minutes: self.tokens.reset_ttl().num_minutes(),
        })
        .await;

        if self.settings.expose_reset_token {
            outcome.token = Some(token);
        }
        Ok(outcome)
    }

    fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            token
        )
    }

    /// Sets a new password with a reset token
    ///
    /// Consuming the token, replacing the hash and revoking every refresh
    /// token of the owner happen in one store transaction.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), IdentityError> {
        let mut errors = input.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
        errors.extend(new_password_errors(
            "new_password",
            &input.new_password,
            &input.confirm_password,
            &[],
        ));
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        if !validate_reset_token_format(&input.token) {
            return Err(IdentityError::TokenNotFound);
        }

        let password_hash = hash_password(&input.new_password)?;
        let user = self
            .tokens
            .redeem_reset_token(&input.token, &password_hash)
            .await?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    /// Changes the caller's password after checking the current one
    pub async fn change_password(
        &self,
        caller: &AuthContext,
        input: ChangePasswordInput,
    ) -> Result<(), IdentityError> {
        input.validate()?;
        let user = self.current_user(caller).await?;

        if !verify_password(&input.old_password, &user.password_hash)? {
            warn!(user_id = %user.id, "Password change rejected: wrong current password");
            return Err(IdentityError::Authentication);
        }

        let errors = new_password_errors(
            "new_password",
            &input.new_password,
            &input.confirm_password,
            &[user.email_local_part(), user.fullname.as_str()],
        );
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        let password_hash = hash_password(&input.new_password)?;
        let now = self.clock.now();
        let revoke_at = self.settings.revoke_sessions_on_password_change.then_some(now);

        if !self
            .store
            .replace_password(user.id, &password_hash, revoke_at)
            .await?
        {
            return Err(IdentityError::NotFound("User".to_string()));
        }

        info!(user_id = %user.id, sessions_revoked = revoke_at.is_some(), "Password changed");

        self.notify(Notification::PasswordChanged {
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            changed_at: now,
        })
        .await;

        Ok(())
    }

    /// The caller's own account
    pub async fn me(&self, caller: &AuthContext) -> Result<PublicUser, IdentityError> {
        let user = self.current_user(caller).await?;
        Ok(PublicUser::from(&user))
    }

    async fn current_user(&self, caller: &AuthContext) -> Result<User, IdentityError> {
        self.store
            .find_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound("User".to_string()))
    }

    async fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.notifier.send(notification).await {
            warn!(kind, error = %e, "Failed to send notification");
        }
    }
}
