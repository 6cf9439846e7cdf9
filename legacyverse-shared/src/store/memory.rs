//! In-process stores
//!
//! All state sits behind one async mutex, so every trait method is a
//! single critical section: multi-row operations are atomic and two
//! concurrent reset redemptions serialize the same way a row lock would
//! serialize them in PostgreSQL. Uniqueness mirrors the database
//! constraints on `email` and `username`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, ProfileStore, ResetRedemption, StoreError};
use crate::models::{
    childhood_image::ChildhoodImage,
    password_reset_token::PasswordResetToken,
    profile::{Profile, UpdateProfile},
    refresh_token::RefreshTokenRecord,
    user::{normalize_email, CreateUser, User},
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    childhood_images: Vec<ChildhoodImage>,
    next_image_id: i64,
    refresh_tokens: HashMap<Uuid, RefreshTokenRecord>,
    reset_tokens: Vec<PasswordResetToken>,
}

impl MemoryState {
    fn revoke_all(&mut self, user_id: Uuid, at: DateTime<Utc>) -> u64 {
        let mut revoked = 0;
        for record in self.refresh_tokens.values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(at);
                revoked += 1;
            }
        }
        revoked
    }

    fn set_password(&mut self, user_id: Uuid, password_hash: &str) -> bool {
        match self.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Locates and marks a live token used, returning its owner's id
    fn take_reset_token(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ResetRedemption> {
        let token = self
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash)
            .ok_or(ResetRedemption::NotFound)?;

        if let Some(rejection) = ResetRedemption::rejection(token, now) {
            return Err(rejection);
        }

        token.is_used = true;
        Ok(token.user_id)
    }

    fn owner(&self, user_id: Uuid) -> Result<User, StoreError> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::Inconsistent(format!("user {} missing", user_id)))
    }
}

/// Memory-backed [`CredentialStore`] and [`ProfileStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of stored profiles
    pub async fn profile_count(&self) -> usize {
        self.state.lock().await.profiles.len()
    }

    /// Every reset token issued for `user_id`, oldest first
    pub async fn reset_tokens_for(&self, user_id: Uuid) -> Vec<PasswordResetToken> {
        self.state
            .lock()
            .await
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let state = self.state.lock().await;

        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;

        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().await;

        Ok(state.users.values().any(|u| u.username == username))
    }

    async fn create_user_with_profile(
        &self,
        data: CreateUser,
    ) -> Result<(User, Profile), StoreError> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if state.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Duplicate("username"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            fullname: data.fullname,
            username: data.username,
            password_hash: data.password_hash,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        let profile = Profile::empty(user.id, now);

        state.users.insert(user.id, user.clone());
        state.profiles.insert(user.id, profile.clone());

        Ok((user, profile))
    }

    async fn replace_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_sessions_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if !state.set_password(user_id, password_hash) {
            return Ok(false);
        }
        if let Some(at) = revoke_sessions_at {
            state.revoke_all(user_id, at);
        }

        Ok(true)
    }

    async fn record_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .refresh_tokens
            .insert(record.jti, record);
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.state.lock().await.refresh_tokens.get(&jti).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        jti: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        match state.refresh_tokens.get_mut(&jti) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_refresh_tokens(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.state.lock().await.revoke_all(user_id, at))
    }

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, StoreError> {
        let mut state = self.state.lock().await;

        for token in state.reset_tokens.iter_mut() {
            if token.user_id == user_id {
                token.is_used = true;
            }
        }

        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            created_at,
            expires_at,
            is_used: false,
        };
        state.reset_tokens.push(token.clone());

        Ok(token)
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetRedemption, StoreError> {
        let mut state = self.state.lock().await;

        match state.take_reset_token(token_hash, now) {
            Ok(user_id) => Ok(ResetRedemption::Redeemed(state.owner(user_id)?)),
            Err(rejection) => Ok(rejection),
        }
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<ResetRedemption, StoreError> {
        let mut state = self.state.lock().await;

        // Validate ownership before mutating so a failure leaves the token unused
        let user_id = match state
            .reset_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
        {
            Some(token) => token.user_id,
            None => return Ok(ResetRedemption::NotFound),
        };
        state.owner(user_id)?;

        if let Err(rejection) = state.take_reset_token(token_hash, now) {
            return Ok(rejection);
        }

        state.set_password(user_id, new_password_hash);
        state.revoke_all(user_id, now);

        Ok(ResetRedemption::Redeemed(state.owner(user_id)?))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        fullname: Option<&str>,
        update: &UpdateProfile,
    ) -> Result<Option<(User, Profile)>, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if !state.users.contains_key(&user_id) || !state.profiles.contains_key(&user_id) {
            return Ok(None);
        }

        let user = match state.users.get_mut(&user_id) {
            Some(user) => {
                if let Some(fullname) = fullname {
                    user.fullname = fullname.to_string();
                    user.updated_at = now;
                }
                user.clone()
            }
            None => return Ok(None),
        };

        let profile = match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.apply(update, now);
                profile.clone()
            }
            None => return Ok(None),
        };

        Ok(Some((user, profile)))
    }

    async fn set_profile_image(
        &self,
        user_id: Uuid,
        image: Option<&str>,
    ) -> Result<Option<Profile>, StoreError> {
        let mut state = self.state.lock().await;

        Ok(state.profiles.get_mut(&user_id).map(|profile| {
            profile.image = image.map(str::to_string);
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn list_childhood_images(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChildhoodImage>, StoreError> {
        let state = self.state.lock().await;

        let mut images: Vec<ChildhoodImage> = state
            .childhood_images
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.position, i.id));

        Ok(images)
    }

    async fn add_childhood_image(
        &self,
        user_id: Uuid,
        image: &str,
        caption: &str,
    ) -> Result<ChildhoodImage, StoreError> {
        let mut state = self.state.lock().await;

        if !state.profiles.contains_key(&user_id) {
            return Err(StoreError::Inconsistent(format!(
                "profile for user {} missing",
                user_id
            )));
        }

        let position = state
            .childhood_images
            .iter()
            .filter(|i| i.user_id == user_id)
            .map(|i| i.position + 1)
            .max()
            .unwrap_or(0);

        state.next_image_id += 1;
        let record = ChildhoodImage {
            id: state.next_image_id,
            user_id,
            image: image.to_string(),
            caption: caption.to_string(),
            position,
            created_at: Utc::now(),
        };
        state.childhood_images.push(record.clone());

        Ok(record)
    }

    async fn update_childhood_image(
        &self,
        user_id: Uuid,
        id: i64,
        caption: Option<&str>,
        position: Option<i32>,
    ) -> Result<Option<ChildhoodImage>, StoreError> {
        let mut state = self.state.lock().await;

        Ok(state
            .childhood_images
            .iter_mut()
            .find(|i| i.id == id && i.user_id == user_id)
            .map(|record| {
                if let Some(caption) = caption {
                    record.caption = caption.to_string();
                }
                if let Some(position) = position {
                    record.position = position;
                }
                record.clone()
            }))
    }

    async fn delete_childhood_image(&self, user_id: Uuid, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.childhood_images.len();

        state
            .childhood_images
            .retain(|i| !(i.id == id && i.user_id == user_id));

        Ok(state.childhood_images.len() < before)
    }

    async fn delete_all_childhood_images(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.childhood_images.len();

        state.childhood_images.retain(|i| i.user_id != user_id);

        Ok((before - state.childhood_images.len()) as u64)
    }
}
