//! Profiles and childhood images

pub mod input;
pub mod service;

pub use service::{ProfileService, ProfileView};
