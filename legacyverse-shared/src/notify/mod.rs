//! Outbound account notifications
//!
//! The identity service describes *what* to tell the user with a
//! [`Notification`]; a [`Notifier`] decides *how* it gets delivered.
//! Delivery is best-effort: callers log a failed send and carry on.

pub mod smtp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

pub use smtp::{SmtpConfig, SmtpNotifier};

const SITE_NAME: &str = "LegacyVerse";

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Recipient or sender address did not parse
    #[error("Invalid address: {0}")]
    Address(String),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Transport rejected or failed to deliver the message
    #[error("Failed to deliver message: {0}")]
    Transport(String),
}

/// A message to a single account holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Welcome {
        email: String,
        fullname: String,
        username: String,
    },
    PasswordReset {
        email: String,
        fullname: String,
        reset_url: String,
        expires_in_minutes: i64,
    },
    PasswordChanged {
        email: String,
        fullname: String,
        changed_at: DateTime<Utc>,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::Welcome { email, .. }
            | Notification::PasswordReset { email, .. }
            | Notification::PasswordChanged { email, .. } => email,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::PasswordReset { .. } => "password_reset",
            Notification::PasswordChanged { .. } => "password_changed",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::Welcome { .. } => format!("Welcome to {}!", SITE_NAME),
            Notification::PasswordReset { .. } => format!("Password Reset Request - {}", SITE_NAME),
            Notification::PasswordChanged { .. } => format!("Password Changed - {}", SITE_NAME),
        }
    }

    /// Plain-text body
    pub fn body(&self) -> String {
        match self {
            Notification::Welcome {
                fullname, username, ..
            } => format!(
                "Hi {fullname},\n\n\
                 Welcome to {SITE_NAME}! Your account is ready and your username is \
                 {username}.\n\n\
                 Start building your profile and sharing your story.\n\n\
                 The {SITE_NAME} Team"
            ),
            Notification::PasswordReset {
                fullname,
                reset_url,
                expires_in_minutes,
                ..
            } => format!(
                "Hi {fullname},\n\n\
                 We received a request to reset your {SITE_NAME} password. Use the link \
                 below to choose a new one:\n\n\
                 {reset_url}\n\n\
                 This link expires in {expires_in_minutes} minutes and can be used once.\n\n\
                 If you did not request a reset, you can ignore this email.\n\n\
                 The {SITE_NAME} Team"
            ),
            Notification::PasswordChanged {
                fullname,
                changed_at,
                ..
            } => format!(
                "Hi {fullname},\n\n\
                 Your {SITE_NAME} password was changed on {}.\n\n\
                 If this wasn't you, reset your password immediately and contact support.\n\n\
                 The {SITE_NAME} Team",
                changed_at.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

/// Delivery channel for [`Notification`]s
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them
///
/// Used when no SMTP server is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            kind = notification.kind(),
            recipient = notification.recipient(),
            subject = %notification.subject(),
            "Email delivery disabled, notification logged"
        );
        Ok(())
    }
}

/// Keeps every notification in memory, optionally failing every send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send returns a transport error
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Most recent notification addressed to `email`
    pub async fn last_for(&self, email: &str) -> Option<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|n| n.recipient() == email)
            .cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

/// Pulls the `token` query parameter out of a reset link
///
/// ```
/// use legacyverse_shared::notify::reset_token_from_url;
///
/// assert_eq!(
///     reset_token_from_url("https://app.example/reset-password?token=abc123"),
///     Some("abc123")
/// );
/// ```
pub fn reset_token_from_url(url: &str) -> Option<&str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
}
