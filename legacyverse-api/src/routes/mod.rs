//! API route handlers
//!
//! - `health`: Health check endpoint
//! - `auth`: Registration, sessions and password management
//! - `profile`: Profiles and childhood images

pub mod auth;
pub mod health;
pub mod profile;

use serde::{Deserialize, Serialize};

/// Body of responses that only confirm an action
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
