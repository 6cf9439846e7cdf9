//! Username derivation
//!
//! Usernames are derived once, at registration, from the display name:
//! keep ASCII letters and digits, lowercase, cut to
//! [`USERNAME_PREFIX_LENGTH`] characters. Collisions get the smallest free
//! numeric suffix starting at 1 ("johndoe", "johndoe1", "johndoe2", ...).

use crate::auth::reset_token::random_string;
use crate::store::{CredentialStore, StoreError};

/// Maximum length of the derived base before any suffix is appended
pub const USERNAME_PREFIX_LENGTH: usize = 8;

/// Column width of `users.username`
pub const MAX_USERNAME_LENGTH: usize = 150;

const PLACEHOLDER_PREFIX: &str = "user";
const PLACEHOLDER_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Computes the base handle for a display name
///
/// Returns `None` when the name contains no ASCII alphanumerics.
///
/// ```
/// use legacyverse_shared::auth::username::username_base;
///
/// assert_eq!(username_base("John Doe").as_deref(), Some("johndoe"));
/// assert_eq!(username_base("Maria-José Álvarez").as_deref(), Some("mariajos"));
/// assert_eq!(username_base("!!!"), None);
/// ```
pub fn username_base(fullname: &str) -> Option<String> {
    let base: String = fullname
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(USERNAME_PREFIX_LENGTH)
        .collect();

    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}

/// Fallback base for names without any usable characters
pub fn placeholder_username() -> String {
    let random_len = USERNAME_PREFIX_LENGTH - PLACEHOLDER_PREFIX.len();
    format!(
        "{}{}",
        PLACEHOLDER_PREFIX,
        random_string(random_len, PLACEHOLDER_CHARSET)
    )
}

/// Appends a numeric suffix, shortening the base if the result would
/// exceed [`MAX_USERNAME_LENGTH`]
pub fn with_suffix(base: &str, suffix: u32) -> String {
    let suffix = suffix.to_string();
    let keep = MAX_USERNAME_LENGTH.saturating_sub(suffix.len()).min(base.len());
    format!("{}{}", &base[..keep], suffix)
}

/// Derives a username not currently present in `store`
///
/// Read-only. Two concurrent registrations can still pick the same handle;
/// the unique constraint catches that and the caller retries.
pub async fn derive_username(
    store: &dyn CredentialStore,
    fullname: &str,
) -> Result<String, StoreError> {
    let base = username_base(fullname).unwrap_or_else(placeholder_username);

    if !store.username_exists(&base).await? {
        return Ok(base);
    }

    let mut suffix: u32 = 1;
    loop {
        let candidate = with_suffix(&base, suffix);
        if !store.username_exists(&candidate).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
