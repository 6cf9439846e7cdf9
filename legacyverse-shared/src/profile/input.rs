//! Request shapes for profile operations

use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::models::profile::UpdateProfile;

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 255, message = "Full name must be between 1 and 255 characters"))]
    pub fullname: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(custom(function = "validate_website"))]
    pub website: Option<String>,

    #[validate(length(max = 500, message = "Education must be at most 500 characters"))]
    pub education: Option<String>,

    #[validate(length(max = 500, message = "Hobbies must be at most 500 characters"))]
    pub hobbies: Option<String>,

    #[validate(length(max = 1000, message = "Early childhood must be at most 1000 characters"))]
    pub early_childhood: Option<String>,

    #[validate(custom(function = "validate_section"))]
    pub family: Option<Value>,

    #[validate(custom(function = "validate_section"))]
    pub community: Option<Value>,

    #[validate(custom(function = "validate_section"))]
    pub professional: Option<Value>,

    #[validate(custom(function = "validate_section"))]
    pub accomplishments: Option<Value>,
}

impl UpdateProfileInput {
    /// Profile-table part of the update
    pub fn to_update(&self) -> UpdateProfile {
        UpdateProfile {
            bio: self.bio.clone(),
            location: self.location.clone(),
            website: self.website.clone(),
            education: self.education.clone(),
            hobbies: self.hobbies.clone(),
            early_childhood: self.early_childhood.clone(),
            family: self.family.clone(),
            community: self.community.clone(),
            professional: self.professional.clone(),
            accomplishments: self.accomplishments.clone(),
        }
    }
}

/// Empty clears the website; anything else must be an http(s) URL
fn validate_website(website: &str) -> Result<(), ValidationError> {
    if website.is_empty() {
        return Ok(());
    }

    let valid = ["http://", "https://"].iter().any(|scheme| {
        website
            .strip_prefix(scheme)
            .map(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
            .unwrap_or(false)
    });

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("url");
        error.message = Some("Enter a valid URL".into());
        Err(error)
    }
}

fn validate_section(section: &Value) -> Result<(), ValidationError> {
    if section.is_object() {
        Ok(())
    } else {
        let mut error = ValidationError::new("object");
        error.message = Some("Must be a JSON object".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileImageInput {
    #[validate(length(min = 1, max = 500, message = "Image reference must be between 1 and 500 characters"))]
    pub image: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AddChildhoodImageInput {
    #[validate(length(min = 1, max = 500, message = "Image reference must be between 1 and 500 characters"))]
    pub image: String,

    #[validate(length(max = 255, message = "Caption must be at most 255 characters"))]
    pub caption: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateChildhoodImageInput {
    #[validate(length(max = 255, message = "Caption must be at most 255 characters"))]
    pub caption: Option<String>,

    #[validate(range(min = 0, message = "Position cannot be negative"))]
    pub position: Option<i32>,
}
