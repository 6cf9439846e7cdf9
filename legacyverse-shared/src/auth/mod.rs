//! Authentication primitives
//!
//! # Modules
//!
//! - [`password`]: Argon2id hashing and the password policy
//! - [`jwt`]: Access and refresh JWTs
//! - [`reset_token`]: Opaque single-use password reset tokens
//! - [`username`]: Username derivation from full names
//! - [`middleware`]: Verified caller context for Axum handlers
//!
//! # Example
//!
//! ```no_run
//! use legacyverse_shared::auth::password::{hash_password, verify_password};
//! use legacyverse_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("river-stone-42")?;
//! assert!(verify_password("river-stone-42", &hash)?);
//!
//! let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
//! let token = create_token(&claims, "a-secret-key-of-at-least-32-bytes!!")?;
//! let verified = validate_access_token(&token, "a-secret-key-of-at-least-32-bytes!!")?;
//! assert_eq!(verified.sub, claims.sub);
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
pub mod username;
