//! Database models
//!
//! Row types plus the SQL that reads and writes them. Each query takes a
//! `PgExecutor`, so callers decide whether it runs on the pool or inside a
//! transaction.
//!
//! - `user`: accounts and login identity
//! - `profile`: one-to-one profile record
//! - `childhood_image`: ordered profile attachments
//! - `password_reset_token`: single-use reset grants
//! - `refresh_token`: revocable refresh-token records

pub mod childhood_image;
pub mod password_reset_token;
pub mod profile;
pub mod refresh_token;
pub mod user;
