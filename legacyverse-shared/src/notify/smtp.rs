//! SMTP delivery via `lettre`

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{debug, info};

use super::{Notification, Notifier, NotifyError};

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// `From` header, e.g. `LegacyVerse <noreply@legacyverse.app>`
    pub from: String,

    /// Upgrade the connection with STARTTLS; plain SMTP otherwise
    pub starttls: bool,
}

/// Sends notifications over a pooled async SMTP transport
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", config.from, e)))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Transport(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(host = %config.host, port = config.port, starttls = config.starttls, "SMTP notifier configured");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let to: Mailbox = notification
            .recipient()
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", notification.recipient(), e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let message = self.build_message(&notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        debug!(kind = notification.kind(), recipient = notification.recipient(), "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            from: "LegacyVerse <noreply@legacyverse.app>".to_string(),
            starttls: false,
        }
    }

    #[tokio::test]
    async fn test_invalid_from_rejected() {
        let mut bad = config();
        bad.from = "not an address".to_string();

        assert!(matches!(SmtpNotifier::new(&bad), Err(NotifyError::Address(_))));
    }

    #[tokio::test]
    async fn test_build_message() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let notification = Notification::Welcome {
            email: "jane@example.com".to_string(),
            fullname: "Jane Doe".to_string(),
            username: "janedoe".to_string(),
        };

        let message = notifier.build_message(&notification).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: jane@example.com"));
        assert!(raw.contains("Subject: Welcome to LegacyVerse!"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let notification = Notification::Welcome {
            email: "broken".to_string(),
            fullname: "Jane".to_string(),
            username: "jane".to_string(),
        };

        assert!(matches!(
            notifier.build_message(&notification),
            Err(NotifyError::Address(_))
        ));
    }
}
