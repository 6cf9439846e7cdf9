//! Persistence seams for the identity and profile services
//!
//! [`CredentialStore`] holds users, refresh-token records and reset grants.
//! [`ProfileStore`] holds profiles and their childhood images. Both are
//! implemented by [`postgres::PgStore`] for production and
//! [`memory::MemoryStore`] for tests and local runs.
//!
//! Operations that touch more than one row in a way that must not be
//! observed half-done are single trait methods, so each implementation can
//! wrap them in one transaction (or one lock scope).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    childhood_image::ChildhoodImage,
    password_reset_token::PasswordResetToken,
    profile::{Profile, UpdateProfile},
    refresh_token::RefreshTokenRecord,
    user::{CreateUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint hit on the named field (`"email"` or `"username"`)
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// A row that must exist was missing mid-operation
    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => {
                        return StoreError::Duplicate("email")
                    }
                    Some(constraint) if constraint.contains("username") => {
                        return StoreError::Duplicate("username")
                    }
                    _ => {}
                }
            }
        }

        StoreError::Database(err)
    }
}

/// Outcome of presenting a reset token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRedemption {
    /// Token was live and is now used; carries the owner
    Redeemed(User),

    /// No token with that hash
    NotFound,

    /// Token exists, unused, but past `expires_at`
    Expired,

    /// Token was already consumed or superseded
    AlreadyUsed,
}

impl ResetRedemption {
    /// Classifies a token that could not be redeemed at `now`
    ///
    /// Returns `None` when the token is live.
    pub fn rejection(token: &PasswordResetToken, now: DateTime<Utc>) -> Option<Self> {
        if token.is_used {
            Some(ResetRedemption::AlreadyUsed)
        } else if token.is_expired(now) {
            Some(ResetRedemption::Expired)
        } else {
            None
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Cheap round-trip for health checks
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Lookup by email; the argument is normalized before comparing
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Creates the user and its empty profile together
    ///
    /// Either both rows exist afterwards or neither does.
    async fn create_user_with_profile(&self, data: CreateUser)
        -> Result<(User, Profile), StoreError>;

    /// Replaces the password hash
    ///
    /// With `revoke_sessions_at` set, every live refresh token of the user
    /// is revoked in the same transaction. Returns false if the user does
    /// not exist.
    async fn replace_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_sessions_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    async fn record_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_refresh_token(&self, jti: Uuid)
        -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Returns false when the record is missing or already revoked
    async fn revoke_refresh_token(&self, jti: Uuid, at: DateTime<Utc>)
        -> Result<bool, StoreError>;

    async fn revoke_all_refresh_tokens(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Stores a new reset grant, marking the user's earlier unused grants
    /// as used in the same transaction
    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, StoreError>;

    /// Marks a live token used and returns its owner
    ///
    /// Concurrent callers with the same hash see exactly one `Redeemed`.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetRedemption, StoreError>;

    /// Consumes the token, replaces the owner's password hash and revokes
    /// all of the owner's refresh tokens, as one transaction
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<ResetRedemption, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Applies a partial profile update and an optional fullname change in
    /// one transaction; `None` if the user has no profile
    async fn update_profile(
        &self,
        user_id: Uuid,
        fullname: Option<&str>,
        update: &UpdateProfile,
    ) -> Result<Option<(User, Profile)>, StoreError>;

    async fn set_profile_image(
        &self,
        user_id: Uuid,
        image: Option<&str>,
    ) -> Result<Option<Profile>, StoreError>;

    async fn list_childhood_images(&self, user_id: Uuid)
        -> Result<Vec<ChildhoodImage>, StoreError>;

    async fn add_childhood_image(
        &self,
        user_id: Uuid,
        image: &str,
        caption: &str,
    ) -> Result<ChildhoodImage, StoreError>;

    async fn update_childhood_image(
        &self,
        user_id: Uuid,
        id: i64,
        caption: Option<&str>,
        position: Option<i32>,
    ) -> Result<Option<ChildhoodImage>, StoreError>;

    async fn delete_childhood_image(&self, user_id: Uuid, id: i64) -> Result<bool, StoreError>;

    async fn delete_all_childhood_images(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
