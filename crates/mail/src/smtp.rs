//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be constructed.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{EmailType, MailError, MailPayload, MailSender};

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@obminyashka.space";

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                      |
    /// |-----------------|----------|------------------------------|
    /// | `SMTP_HOST`     | yes      | --                           |
    /// | `SMTP_PORT`     | no       | `587`                        |
    /// | `SMTP_FROM`     | no       | `noreply@obminyashka.space`  |
    /// | `SMTP_USER`     | no       | --                           |
    /// | `SMTP_PASSWORD` | no       | --                           |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Sends template emails through an SMTP relay.
pub struct SmtpMailer {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the mailer. The transport connects lazily on first send.
    pub fn new(config: EmailConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    fn build_message(
        &self,
        to: &str,
        email_type: EmailType,
        payload: &MailPayload,
    ) -> Result<Message, MailError> {
        Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(email_type.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(email_type.render(payload))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        email_type: EmailType,
        payload: &MailPayload,
    ) -> Result<(), MailError> {
        let message = self.build_message(to, email_type, payload)?;
        self.transport.send(message).await?;
        tracing::info!(to, ?email_type, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 2525,
            from_address: DEFAULT_FROM_ADDRESS.into(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[tokio::test]
    async fn invalid_recipient_is_address_error() {
        let mailer = SmtpMailer::new(config()).expect("transport builds without connecting");
        let payload = MailPayload {
            username: "bob".into(),
            confirmation_url: "http://localhost/x".into(),
        };
        let err = mailer
            .build_message("not-an-email", EmailType::Registration, &payload)
            .unwrap_err();
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[tokio::test]
    async fn message_builds_for_valid_addresses() {
        let mailer = SmtpMailer::new(config()).expect("transport builds without connecting");
        let payload = MailPayload {
            username: "bob".into(),
            confirmation_url: "http://localhost/x".into(),
        };
        assert!(mailer
            .build_message("bob@example.com", EmailType::Registration, &payload)
            .is_ok());
    }
}
