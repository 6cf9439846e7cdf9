//! Profile endpoints
//!
//! Everything except the public lookup acts on the caller's own profile.

use super::MessageResponse;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use legacyverse_shared::{
    auth::middleware::AuthContext,
    models::childhood_image::ChildhoodImage,
    profile::{
        input::{
            AddChildhoodImageInput, ProfileImageInput, UpdateChildhoodImageInput,
            UpdateProfileInput,
        },
        ProfileView,
    },
};
use serde::{Deserialize, Serialize};

/// Response of the delete-all endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
    pub deleted: u64,
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.get_profile(&auth).await?))
}

/// Partial update
///
/// ```text
/// PATCH /v1/profile
///
/// { "bio": "Retired librarian", "family": { "children": 3 } }
/// ```
///
/// Fields left out keep their values. `username` cannot be changed.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileInput>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.update_profile(&auth, req).await?))
}

/// Public profile lookup by username
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.get_profile_by_username(&username).await?))
}

pub async fn set_profile_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ProfileImageInput>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.set_profile_image(&auth, req).await?))
}

/// # Errors
///
/// - `422 Unprocessable Entity`: No profile image to delete
pub async fn delete_profile_image(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MessageResponse>> {
    state.profiles.clear_profile_image(&auth).await?;
    Ok(Json(MessageResponse::new("Profile image deleted successfully")))
}

pub async fn list_childhood_images(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<ChildhoodImage>>> {
    Ok(Json(state.profiles.list_childhood_images(&auth).await?))
}

/// Appends an image after the caller's existing ones
pub async fn add_childhood_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AddChildhoodImageInput>,
) -> ApiResult<(StatusCode, Json<ChildhoodImage>)> {
    let image = state.profiles.add_childhood_image(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn update_childhood_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<UpdateChildhoodImageInput>,
) -> ApiResult<Json<ChildhoodImage>> {
    Ok(Json(state.profiles.update_childhood_image(&auth, id, req).await?))
}

pub async fn delete_childhood_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.profiles.delete_childhood_image(&auth, id).await?;
    Ok(Json(MessageResponse::new("Childhood image deleted successfully")))
}

pub async fn delete_all_childhood_images(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = state.profiles.delete_all_childhood_images(&auth).await?;
    Ok(Json(DeletedResponse {
        message: "All childhood images deleted successfully".to_string(),
        deleted,
    }))
}
