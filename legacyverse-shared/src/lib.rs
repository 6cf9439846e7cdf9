//! # LegacyVerse Shared Library
//!
//! Identity core for the LegacyVerse API: accounts, sessions, password
//! recovery and profiles, independent of the HTTP layer.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWTs, reset tokens, username derivation
//! - `clock`: Injectable time source
//! - `db`: Connection pool and migrations
//! - `identity`: Registration, login, logout, refresh and password flows
//! - `models`: Database models and queries
//! - `notify`: Account email notifications
//! - `profile`: Profile and childhood image management
//! - `store`: Persistence traits with PostgreSQL and in-memory backends

pub mod auth;
pub mod clock;
pub mod db;
pub mod identity;
pub mod models;
pub mod notify;
pub mod profile;
pub mod store;

/// Current version of the LegacyVerse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
