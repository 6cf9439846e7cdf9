//! Session and reset-token issuing
//!
//! JWT timestamps come from the system time. Refresh-token records and
//! reset grants are stamped and checked with the injected [`Clock`].

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::IdentityError;
use crate::auth::jwt::{
    create_token, decode_refresh_token_ignoring_expiry, validate_access_token,
    validate_refresh_token, Claims, JwtError, TokenType,
};
use crate::auth::middleware::AuthContext;
use crate::auth::reset_token::{generate_reset_token, hash_reset_token, validate_reset_token_format};
use crate::clock::Clock;
use crate::models::{refresh_token::RefreshTokenRecord, user::User};
use crate::store::{CredentialStore, ResetRedemption};

/// Access/refresh pair handed out on register and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
            reset_ttl,
        }
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    fn sign(&self, user_id: Uuid, token_type: TokenType, ttl: Duration) -> Result<(Claims, String), JwtError> {
        let claims = Claims::with_expiration(user_id, token_type, ttl);
        let token = create_token(&claims, &self.secret)?;
        Ok((claims, token))
    }

    /// Mints an access/refresh pair and records the refresh `jti`
    pub async fn issue_session(&self, user_id: Uuid) -> Result<SessionTokens, IdentityError> {
        let (_, access) = self.sign(user_id, TokenType::Access, self.access_ttl)?;
        let (refresh_claims, refresh) = self.sign(user_id, TokenType::Refresh, self.refresh_ttl)?;

        let now = self.clock.now();
        self.store
            .record_refresh_token(RefreshTokenRecord::new(
                refresh_claims.jti,
                user_id,
                now,
                now + self.refresh_ttl,
            ))
            .await?;

        debug!(user_id = %user_id, jti = %refresh_claims.jti, "Issued session tokens");
        Ok(SessionTokens { access, refresh })
    }

    /// Exchanges a live refresh token for a new access token
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh_session(&self, refresh: &str) -> Result<String, IdentityError> {
        let claims = validate_refresh_token(refresh, &self.secret).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            IdentityError::InvalidToken
        })?;

        let record = self
            .store
            .find_refresh_token(claims.jti)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        if record.user_id != claims.sub || !record.is_live(self.clock.now()) {
            debug!(jti = %claims.jti, "Refresh token revoked or expired");
            return Err(IdentityError::InvalidToken);
        }

        let (_, access) = self.sign(claims.sub, TokenType::Access, self.access_ttl)?;
        Ok(access)
    }

    fn decode_for_revocation(&self, refresh: &str) -> Result<Claims, IdentityError> {
        decode_refresh_token_ignoring_expiry(refresh, &self.secret).map_err(|e| {
            debug!(error = %e, "Refresh token rejected for revocation");
            IdentityError::InvalidToken
        })
    }

    /// Revokes a refresh token; revoking twice is not an error
    pub async fn revoke(&self, refresh: &str) -> Result<(), IdentityError> {
        let claims = self.decode_for_revocation(refresh)?;
        self.store
            .revoke_refresh_token(claims.jti, self.clock.now())
            .await?;
        Ok(())
    }

    /// Like [`revoke`](Self::revoke), but only for tokens owned by `caller`
    pub async fn revoke_owned(&self, caller: &AuthContext, refresh: &str) -> Result<(), IdentityError> {
        let claims = self.decode_for_revocation(refresh)?;
        if claims.sub != caller.user_id {
            return Err(IdentityError::InvalidToken);
        }

        let revoked = self
            .store
            .revoke_refresh_token(claims.jti, self.clock.now())
            .await?;
        debug!(user_id = %caller.user_id, jti = %claims.jti, revoked, "Revoked refresh token");
        Ok(())
    }

    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, IdentityError> {
        Ok(self
            .store
            .revoke_all_refresh_tokens(user_id, self.clock.now())
            .await?)
    }

    /// Stateless access-token check used by the HTTP layer
    pub fn verify_access(&self, access: &str) -> Result<Claims, JwtError> {
        validate_access_token(access, &self.secret)
    }

    /// Creates a reset grant for `user_id` and returns the plaintext token
    ///
    /// Only the SHA-256 hash is stored. Earlier unused grants are superseded.
    pub async fn issue_reset_token(&self, user_id: Uuid) -> Result<String, IdentityError> {
        let (token, hash) = generate_reset_token();
        let now = self.clock.now();

        let grant = self
            .store
            .create_reset_token(user_id, &hash, now, now + self.reset_ttl)
            .await?;

        info!(user_id = %user_id, expires_at = %grant.expires_at, "Issued password reset token");
        Ok(token)
    }

    /// Marks a reset token used and returns its owner
    pub async fn consume_reset_token(&self, token: &str) -> Result<User, IdentityError> {
        if !validate_reset_token_format(token) {
            return Err(IdentityError::TokenNotFound);
        }

        let redemption = self
            .store
            .consume_reset_token(&hash_reset_token(token), self.clock.now())
            .await?;
        redemption_result(redemption)
    }

    /// Consumes a reset token and installs `new_password_hash` in one store
    /// transaction, revoking the owner's refresh tokens
    pub async fn redeem_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
    ) -> Result<User, IdentityError> {
        if !validate_reset_token_format(token) {
            return Err(IdentityError::TokenNotFound);
        }

        let redemption = self
            .store
            .redeem_reset_token(&hash_reset_token(token), self.clock.now(), new_password_hash)
            .await?;
        redemption_result(redemption)
    }
}

fn redemption_result(redemption: ResetRedemption) -> Result<User, IdentityError> {
    match redemption {
        ResetRedemption::Redeemed(user) => Ok(user),
        ResetRedemption::NotFound => Err(IdentityError::TokenNotFound),
        ResetRedemption::Expired => Err(IdentityError::TokenExpired),
        ResetRedemption::AlreadyUsed => Err(IdentityError::TokenAlreadyUsed),
    }
}
