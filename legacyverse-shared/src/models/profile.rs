//! Profile model
//!
//! One row per user, keyed by `user_id`, created in the same transaction
//! as the user. The structured sections (`family`, `community`,
//! `professional`, `accomplishments`) are free-form JSON objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "user_id, image, bio, location, website, education, hobbies, \
     early_childhood, family, community, professional, accomplishments, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,

    /// Image reference (URL or storage key)
    pub image: Option<String>,

    pub bio: String,
    pub location: String,
    pub website: String,
    pub education: String,
    pub hobbies: String,
    pub early_childhood: String,

    pub family: Value,
    pub community: Value,
    pub professional: Value,
    pub accomplishments: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Blank profile as the database defaults would create it
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            image: None,
            bio: String::new(),
            location: String::new(),
            website: String::new(),
            education: String::new(),
            hobbies: String::new(),
            early_childhood: String::new(),
            family: empty_section(),
            community: empty_section(),
            professional: empty_section(),
            accomplishments: empty_section(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the `Some` fields of `update` in place
    pub fn apply(&mut self, update: &UpdateProfile, now: DateTime<Utc>) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        set(&mut self.bio, &update.bio);
        set(&mut self.location, &update.location);
        set(&mut self.website, &update.website);
        set(&mut self.education, &update.education);
        set(&mut self.hobbies, &update.hobbies);
        set(&mut self.early_childhood, &update.early_childhood);
        set(&mut self.family, &update.family);
        set(&mut self.community, &update.community);
        set(&mut self.professional, &update.professional);
        set(&mut self.accomplishments, &update.accomplishments);
        self.updated_at = now;
    }

    pub async fn create_default<'e, E>(executor: E, user_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("INSERT INTO profiles (user_id) VALUES ($1) RETURNING {PROFILE_COLUMNS}");

        sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");

        sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Partial update; `None` fields keep their stored value
    pub async fn update<'e, E>(
        executor: E,
        user_id: Uuid,
        data: &UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE profiles SET
                bio = COALESCE($2, bio),
                location = COALESCE($3, location),
                website = COALESCE($4, website),
                education = COALESCE($5, education),
                hobbies = COALESCE($6, hobbies),
                early_childhood = COALESCE($7, early_childhood),
                family = COALESCE($8, family),
                community = COALESCE($9, community),
                professional = COALESCE($10, professional),
                accomplishments = COALESCE($11, accomplishments),
                updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .bind(&data.bio)
            .bind(&data.location)
            .bind(&data.website)
            .bind(&data.education)
            .bind(&data.hobbies)
            .bind(&data.early_childhood)
            .bind(&data.family)
            .bind(&data.community)
            .bind(&data.professional)
            .bind(&data.accomplishments)
            .fetch_optional(executor)
            .await
    }

    /// Sets or clears the profile image
    pub async fn set_image<'e, E>(
        executor: E,
        user_id: Uuid,
        image: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE profiles SET image = $2, updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .bind(image)
            .fetch_optional(executor)
            .await
    }
}

/// Empty JSON object for a structured section
pub fn empty_section() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Profile fields that may change in a partial update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateProfile {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub education: Option<String>,
    pub hobbies: Option<String>,
    pub early_childhood: Option<String>,
    pub family: Option<Value>,
    pub community: Option<Value>,
    pub professional: Option<Value>,
    pub accomplishments: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_profile() {
        let user_id = Uuid::new_v4();
        let profile = Profile::empty(user_id, Utc::now());

        assert_eq!(profile.user_id, user_id);
        assert!(profile.image.is_none());
        assert_eq!(profile.family, json!({}));
    }

    #[test]
    fn test_apply_partial_update() {
        let mut profile = Profile::empty(Uuid::new_v4(), Utc::now());
        profile.location = "Lagos".to_string();

        profile.apply(
            &UpdateProfile {
                bio: Some("Storyteller".to_string()),
                family: Some(json!({"siblings": 3})),
                ..Default::default()
            },
            Utc::now(),
        );

        assert_eq!(profile.bio, "Storyteller");
        assert_eq!(profile.location, "Lagos");
        assert_eq!(profile.family["siblings"], 3);
        assert_eq!(profile.community, json!({}));
    }
}
