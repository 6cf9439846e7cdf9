//! Configuration management for the API server
//!
//! Settings come from environment variables, with a `.env` file loaded
//! first when present.
//!
//! # Environment Variables
//!
//! - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
//! - `API_PRODUCTION`: enables HSTS (default `false`)
//! - `CORS_ORIGINS`: comma-separated origins, `*` for any (default `*`)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
//! - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
//! - `JWT_ACCESS_TTL_MINUTES` (default 60), `JWT_REFRESH_TTL_DAYS` (default 7)
//! - `RESET_TOKEN_TTL_MINUTES` (default 60)
//! - `FRONTEND_URL`: base of password reset links (default `http://localhost:3000`)
//! - `AUTH_EXPOSE_RESET_TOKEN`: return reset tokens in responses (default `false`)
//! - `AUTH_REVOKE_SESSIONS_ON_PASSWORD_CHANGE` (default `true`)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_STARTTLS`,
//!   `EMAIL_FROM`: outgoing mail; without `SMTP_HOST` notifications are only logged
//!
//! # Example
//!
//! ```no_run
//! use legacyverse_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use chrono::Duration;
use legacyverse_shared::identity::IdentitySettings;
use legacyverse_shared::notify::SmtpConfig;
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,

    /// `None` when `SMTP_HOST` is unset
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode turns on HSTS
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing key
    ///
    /// Must be at least 32 characters. Generate with `openssl rand -hex 32`.
    pub jwt_secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    pub frontend_url: String,
    pub expose_reset_token: bool,
    pub revoke_sessions_on_password_change: bool,
}

impl AuthConfig {
    pub fn identity_settings(&self) -> IdentitySettings {
        IdentitySettings {
            jwt_secret: self.jwt_secret.clone(),
            access_token_ttl: Duration::minutes(self.access_ttl_minutes),
            refresh_token_ttl: Duration::days(self.refresh_ttl_days),
            reset_token_ttl: Duration::minutes(self.reset_ttl_minutes),
            frontend_url: self.frontend_url.clone(),
            expose_reset_token: self.expose_reset_token,
            revoke_sessions_on_password_change: self.revoke_sessions_on_password_change,
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{} must be a boolean, got: {}", key, v),
    }
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let smtp = match lookup("SMTP_HOST") {
            Some(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host: host.trim().to_string(),
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: lookup("SMTP_USERNAME"),
                password: lookup("SMTP_PASSWORD"),
                from: lookup("EMAIL_FROM")
                    .unwrap_or_else(|| "LegacyVerse <noreply@legacyverse.app>".to_string()),
                starttls: flag_or(&lookup, "SMTP_STARTTLS", true)?,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                production: flag_or(&lookup, "API_PRODUCTION", false)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthConfig {
                jwt_secret,
                access_ttl_minutes: parse_or(&lookup, "JWT_ACCESS_TTL_MINUTES", 60)?,
                refresh_ttl_days: parse_or(&lookup, "JWT_REFRESH_TTL_DAYS", 7)?,
                reset_ttl_minutes: parse_or(&lookup, "RESET_TOKEN_TTL_MINUTES", 60)?,
                frontend_url: lookup("FRONTEND_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string()),
                expose_reset_token: flag_or(&lookup, "AUTH_EXPOSE_RESET_TOKEN", false)?,
                revoke_sessions_on_password_change: flag_or(
                    &lookup,
                    "AUTH_REVOKE_SESSIONS_ON_PASSWORD_CHANGE",
                    true,
                )?,
            },
            smtp,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
