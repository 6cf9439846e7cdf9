//! Childhood image attachments
//!
//! Ordered child rows of a profile. Listing order is `(position, id)`;
//! new images go to the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChildhoodImage {
    pub id: i64,

    #[serde(skip_serializing)]
    pub user_id: Uuid,

    /// Image reference (URL or storage key)
    pub image: String,

    pub caption: String,

    pub position: i32,

    pub created_at: DateTime<Utc>,
}

impl ChildhoodImage {
    pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ChildhoodImage>(
            r#"
            SELECT id, user_id, image, caption, position, created_at
            FROM childhood_images
            WHERE user_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Appends an image after the current last position
    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        image: &str,
        caption: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ChildhoodImage>(
            r#"
            INSERT INTO childhood_images (user_id, image, caption, position)
            VALUES (
                $1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM childhood_images WHERE user_id = $1)
            )
            RETURNING id, user_id, image, caption, position, created_at
            "#,
        )
        .bind(user_id)
        .bind(image)
        .bind(caption)
        .fetch_one(executor)
        .await
    }

    /// Updates caption and/or position of an image owned by `user_id`
    pub async fn update<'e, E>(
        executor: E,
        user_id: Uuid,
        id: i64,
        caption: Option<&str>,
        position: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ChildhoodImage>(
            r#"
            UPDATE childhood_images
            SET caption = COALESCE($3, caption),
                position = COALESCE($4, position)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, image, caption, position, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(caption)
        .bind(position)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, user_id: Uuid, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM childhood_images WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every image of the user, returning how many were deleted
    pub async fn delete_all<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM childhood_images WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
