//! Password-reset token values
//!
//! A reset token is 32 random base62 characters handed to the user by
//! email. Only its SHA-256 hex digest is stored, so a leaked table cannot
//! be replayed.
//!
//! ```
//! use legacyverse_shared::auth::reset_token::{generate_reset_token, hash_reset_token};
//!
//! let (token, hash) = generate_reset_token();
//! assert_eq!(token.len(), 32);
//! assert_eq!(hash, hash_reset_token(&token));
//! ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a reset token (characters)
pub const RESET_TOKEN_LENGTH: usize = 32;

pub(crate) const BASE62: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a new reset token
///
/// Returns `(plaintext_token, sha256_hex)`. The plaintext goes into the
/// email; the hash goes into the store.
pub fn generate_reset_token() -> (String, String) {
    let token = random_string(RESET_TOKEN_LENGTH, BASE62);
    let hash = hash_reset_token(&token);

    (token, hash)
}

/// Draws `length` characters uniformly from `charset`
pub(crate) fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..charset.len());
            charset[idx] as char
        })
        .collect()
}

/// Hashes a reset token using SHA-256 (hex, 64 characters)
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cheap shape check before touching the store
pub fn validate_reset_token_format(token: &str) -> bool {
    token.len() == RESET_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}
