//! Profile reads and edits
//!
//! Profiles are created together with their user during registration, so
//! a missing profile for an existing user is reported as an internal error
//! rather than a 404.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::input::{
    AddChildhoodImageInput, ProfileImageInput, UpdateChildhoodImageInput, UpdateProfileInput,
};
use crate::auth::middleware::AuthContext;
use crate::identity::IdentityError;
use crate::models::{childhood_image::ChildhoodImage, profile::Profile, user::User};
use crate::store::{CredentialStore, ProfileStore};

/// Profile joined with the owner's public account fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub fullname: String,
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
    pub childhood_images: Vec<ChildhoodImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(user: &User, profile: Profile, childhood_images: Vec<ChildhoodImage>) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            image: profile.image,
            bio: profile.bio,
            location: profile.location,
            website: profile.website,
            education: profile.education,
            hobbies: profile.hobbies,
            early_childhood: profile.early_childhood,
            family: profile.family,
            community: profile.community,
            professional: profile.professional,
            accomplishments: profile.accomplishments,
            childhood_images,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    users: Arc<dyn CredentialStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>, users: Arc<dyn CredentialStore>) -> Self {
        Self { profiles, users }
    }

    async fn view_for(&self, user: &User) -> Result<ProfileView, IdentityError> {
        let profile = self.profile_of(user.id).await?;
        let images = self.profiles.list_childhood_images(user.id).await?;
        Ok(ProfileView::new(user, profile, images))
    }

    async fn profile_of(&self, user_id: Uuid) -> Result<Profile, IdentityError> {
        self.profiles
            .find_profile(user_id)
            .await?
            .ok_or_else(|| IdentityError::Internal(format!("user {} has no profile", user_id)))
    }

    async fn caller_user(&self, caller: &AuthContext) -> Result<User, IdentityError> {
        self.users
            .find_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound("User".to_string()))
    }

    pub async fn get_profile(&self, caller: &AuthContext) -> Result<ProfileView, IdentityError> {
        let user = self.caller_user(caller).await?;
        self.view_for(&user).await
    }

    /// Public lookup by handle
    pub async fn get_profile_by_username(&self, username: &str) -> Result<ProfileView, IdentityError> {
        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| IdentityError::NotFound("User".to_string()))?;
        self.view_for(&user).await
    }

    /// Partial update of profile fields and the owner's full name
    ///
    /// The username is not editable.
    pub async fn update_profile(
        &self,
        caller: &AuthContext,
        mut input: UpdateProfileInput,
    ) -> Result<ProfileView, IdentityError> {
        if let Some(fullname) = input.fullname.as_mut() {
            *fullname = fullname.trim().to_string();
        }
        if let Some(website) = input.website.as_mut() {
            *website = website.trim().to_string();
        }
        input.validate()?;

        let (user, profile) = self
            .profiles
            .update_profile(caller.user_id, input.fullname.as_deref(), &input.to_update())
            .await?
            .ok_or_else(|| IdentityError::NotFound("User".to_string()))?;
        let images = self.profiles.list_childhood_images(user.id).await?;

        info!(user_id = %user.id, "Profile updated");
        Ok(ProfileView::new(&user, profile, images))
    }

    pub async fn set_profile_image(
        &self,
        caller: &AuthContext,
        input: ProfileImageInput,
    ) -> Result<ProfileView, IdentityError> {
        input.validate()?;
        let user = self.caller_user(caller).await?;

        self.profiles
            .set_profile_image(user.id, Some(input.image.trim()))
            .await?
            .ok_or_else(|| IdentityError::NotFound("Profile".to_string()))?;

        info!(user_id = %user.id, "Profile image updated");
        self.view_for(&user).await
    }

    /// Clears the profile image; fails when none is set
    pub async fn clear_profile_image(&self, caller: &AuthContext) -> Result<(), IdentityError> {
        let profile = self.profile_of(caller.user_id).await?;
        if profile.image.is_none() {
            return Err(IdentityError::field("image", "No profile image to delete"));
        }

        self.profiles.set_profile_image(caller.user_id, None).await?;

        info!(user_id = %caller.user_id, "Profile image deleted");
        Ok(())
    }

    pub async fn list_childhood_images(
        &self,
        caller: &AuthContext,
    ) -> Result<Vec<ChildhoodImage>, IdentityError> {
        Ok(self.profiles.list_childhood_images(caller.user_id).await?)
    }

    /// Appends an image after the caller's existing ones
    pub async fn add_childhood_image(
        &self,
        caller: &AuthContext,
        input: AddChildhoodImageInput,
    ) -> Result<ChildhoodImage, IdentityError> {
        input.validate()?;
        let image = self
            .profiles
            .add_childhood_image(caller.user_id, input.image.trim(), &input.caption)
            .await?;

        info!(user_id = %caller.user_id, image_id = image.id, "Childhood image added");
        Ok(image)
    }

    pub async fn update_childhood_image(
        &self,
        caller: &AuthContext,
        id: i64,
        input: UpdateChildhoodImageInput,
    ) -> Result<ChildhoodImage, IdentityError> {
        input.validate()?;
        self.profiles
            .update_childhood_image(caller.user_id, id, input.caption.as_deref(), input.position)
            .await?
            .ok_or_else(|| IdentityError::NotFound("Childhood image".to_string()))
    }

    pub async fn delete_childhood_image(&self, caller: &AuthContext, id: i64) -> Result<(), IdentityError> {
        if !self.profiles.delete_childhood_image(caller.user_id, id).await? {
            return Err(IdentityError::NotFound("Childhood image".to_string()));
        }

        info!(user_id = %caller.user_id, image_id = id, "Childhood image deleted");
        Ok(())
    }

    /// Removes all of the caller's childhood images; returns how many
    pub async fn delete_all_childhood_images(&self, caller: &AuthContext) -> Result<u64, IdentityError> {
        let deleted = self.profiles.delete_all_childhood_images(caller.user_id).await?;

        info!(user_id = %caller.user_id, deleted, "Childhood images deleted");
        Ok(deleted)
    }
}
