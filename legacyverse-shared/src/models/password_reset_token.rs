//! Password-reset grants
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE password_reset_tokens (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     token_hash CHAR(64) NOT NULL UNIQUE,   -- SHA-256 hex of the emailed value
//!     created_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     is_used BOOLEAN NOT NULL DEFAULT FALSE
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// A single-use, time-limited reset grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,

    pub user_id: Uuid,

    /// SHA-256 hex of the plaintext token
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    pub is_used: bool,
}

impl PasswordResetToken {
    /// Expired once `now` reaches `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, created_at, expires_at, is_used
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Marks every outstanding token of the user as used
    pub async fn supersede_unused<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET is_used = TRUE WHERE user_id = $1 AND NOT is_used",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Looks a token up by hash and row-locks it until the transaction ends
    ///
    /// A second transaction asking for the same row blocks here and then
    /// sees `is_used = true`.
    pub async fn find_by_hash_for_update<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, token_hash, created_at, expires_at, is_used
            FROM password_reset_tokens
            WHERE token_hash = $1
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    pub async fn mark_used<'e, E>(executor: E, id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE password_reset_tokens SET is_used = TRUE WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }
}
