//! Server-side refresh-token records
//!
//! A refresh JWT is honored only while the row keyed by its `jti` exists,
//! is unrevoked and unexpired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn new(jti: Uuid, user_id: Uuid, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            jti,
            user_id,
            issued_at,
            expires_at,
            revoked_at: None,
        }
    }

    /// Usable for minting access tokens at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    pub async fn insert<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, issued_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(self.jti)
        .bind(self.user_id)
        .bind(self.issued_at)
        .bind(self.expires_at)
        .bind(self.revoked_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find<'e, E>(executor: E, jti: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT jti, user_id, issued_at, expires_at, revoked_at FROM refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(executor)
        .await
    }

    /// Revokes one record; false when it was missing or already revoked
    pub async fn revoke<'e, E>(executor: E, jti: Uuid, at: DateTime<Utc>) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE jti = $1 AND revoked_at IS NULL",
        )
        .bind(jti)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_all_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
