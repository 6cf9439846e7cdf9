//! PostgreSQL-backed stores
//!
//! Multi-row operations open a transaction with `pool.begin()`, run the
//! model queries against it and commit only on the success path. Any early
//! return drops the transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, ProfileStore, ResetRedemption, StoreError};
use crate::db::pool::health_check;
use crate::models::{
    childhood_image::ChildhoodImage,
    password_reset_token::PasswordResetToken,
    profile::{Profile, UpdateProfile},
    refresh_token::RefreshTokenRecord,
    user::{CreateUser, User},
};

/// Store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(User::username_exists(&self.pool, username).await?)
    }

    async fn create_user_with_profile(
        &self,
        data: CreateUser,
    ) -> Result<(User, Profile), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = User::create(&mut *tx, &data).await?;
        let profile = Profile::create_default(&mut *tx, user.id).await?;

        tx.commit().await?;

        debug!(user_id = %user.id, "Created user and profile");
        Ok((user, profile))
    }

    async fn replace_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_sessions_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !User::update_password(&mut *tx, user_id, password_hash).await? {
            return Ok(false);
        }

        if let Some(at) = revoke_sessions_at {
            let revoked = RefreshTokenRecord::revoke_all_for_user(&mut *tx, user_id, at).await?;
            debug!(user_id = %user_id, revoked, "Revoked refresh tokens on password change");
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn record_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        record.insert(&self.pool).await?;
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(RefreshTokenRecord::find(&self.pool, jti).await?)
    }

    async fn revoke_refresh_token(
        &self,
        jti: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(RefreshTokenRecord::revoke(&self.pool, jti, at).await?)
    }

    async fn revoke_all_refresh_tokens(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(RefreshTokenRecord::revoke_all_for_user(&self.pool, user_id, at).await?)
    }

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, StoreError> {
        let mut tx = self.pool.begin().await?;

        let superseded = PasswordResetToken::supersede_unused(&mut *tx, user_id).await?;
        let token =
            PasswordResetToken::create(&mut *tx, user_id, token_hash, created_at, expires_at)
                .await?;

        tx.commit().await?;

        debug!(user_id = %user_id, superseded, "Stored password reset token");
        Ok(token)
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetRedemption, StoreError> {
        let mut tx = self.pool.begin().await?;

        let token = match PasswordResetToken::find_by_hash_for_update(&mut *tx, token_hash).await? {
            Some(token) => token,
            None => return Ok(ResetRedemption::NotFound),
        };

        if let Some(rejection) = ResetRedemption::rejection(&token, now) {
            return Ok(rejection);
        }

        PasswordResetToken::mark_used(&mut *tx, token.id).await?;
        let user = User::find_by_id(&mut *tx, token.user_id)
            .await?
            .ok_or_else(|| StoreError::Inconsistent(format!("reset token {} has no owner", token.id)))?;

        tx.commit().await?;
        Ok(ResetRedemption::Redeemed(user))
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<ResetRedemption, StoreError> {
        let mut tx = self.pool.begin().await?;

        let token = match PasswordResetToken::find_by_hash_for_update(&mut *tx, token_hash).await? {
            Some(token) => token,
            None => return Ok(ResetRedemption::NotFound),
        };

        if let Some(rejection) = ResetRedemption::rejection(&token, now) {
            return Ok(rejection);
        }

        PasswordResetToken::mark_used(&mut *tx, token.id).await?;

        if !User::update_password(&mut *tx, token.user_id, new_password_hash).await? {
            return Err(StoreError::Inconsistent(format!(
                "reset token {} has no owner",
                token.id
            )));
        }

        let revoked = RefreshTokenRecord::revoke_all_for_user(&mut *tx, token.user_id, now).await?;

        let user = User::find_by_id(&mut *tx, token.user_id)
            .await?
            .ok_or_else(|| StoreError::Inconsistent(format!("reset token {} has no owner", token.id)))?;

        tx.commit().await?;

        debug!(user_id = %user.id, revoked, "Redeemed password reset token");
        Ok(ResetRedemption::Redeemed(user))
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::find_by_user(&self.pool, user_id).await?)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        fullname: Option<&str>,
        update: &UpdateProfile,
    ) -> Result<Option<(User, Profile)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = match fullname {
            Some(fullname) => User::update_fullname(&mut *tx, user_id, fullname).await?,
            None => User::find_by_id(&mut *tx, user_id).await?,
        };
        let Some(user) = user else {
            return Ok(None);
        };

        let Some(profile) = Profile::update(&mut *tx, user_id, update).await? else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some((user, profile)))
    }

    async fn set_profile_image(
        &self,
        user_id: Uuid,
        image: Option<&str>,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::set_image(&self.pool, user_id, image).await?)
    }

    async fn list_childhood_images(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChildhoodImage>, StoreError> {
        Ok(ChildhoodImage::list_for_user(&self.pool, user_id).await?)
    }

    async fn add_childhood_image(
        &self,
        user_id: Uuid,
        image: &str,
        caption: &str,
    ) -> Result<ChildhoodImage, StoreError> {
        Ok(ChildhoodImage::create(&self.pool, user_id, image, caption).await?)
    }

    async fn update_childhood_image(
        &self,
        user_id: Uuid,
        id: i64,
        caption: Option<&str>,
        position: Option<i32>,
    ) -> Result<Option<ChildhoodImage>, StoreError> {
        Ok(ChildhoodImage::update(&self.pool, user_id, id, caption, position).await?)
    }

    async fn delete_childhood_image(&self, user_id: Uuid, id: i64) -> Result<bool, StoreError> {
        Ok(ChildhoodImage::delete(&self.pool, user_id, id).await?)
    }

    async fn delete_all_childhood_images(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(ChildhoodImage::delete_all(&self.pool, user_id).await?)
    }
}
