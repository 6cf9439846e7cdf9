//! Custom middleware for the API server
//!
//! JWT authentication lives in [`crate::app`] because it needs the
//! application state.

pub mod security;
