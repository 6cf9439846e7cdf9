//! Identity core: registration, sessions and password recovery
//!
//! [`IdentityService`] is the entry point used by the HTTP layer. Token
//! minting and redemption live in [`TokenIssuer`].

pub mod error;
pub mod input;
pub mod issuer;
pub mod service;

pub use error::{FieldError, IdentityError};
pub use issuer::{SessionTokens, TokenIssuer};
pub use service::{AuthSession, ForgotPasswordOutcome, IdentityService, IdentitySettings};
