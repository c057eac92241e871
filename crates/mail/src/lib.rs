//! Outbound mail transport.
//!
//! - [`MailSender`] -- fire-and-forget send contract consumed by the API.
//! - [`smtp::SmtpMailer`] -- `lettre` async SMTP implementation.
//! - [`LogMailer`] -- fallback that only logs, used when SMTP is not configured.
//! - [`EmailType`] -- the templates the platform sends.

pub mod smtp;

use async_trait::async_trait;

pub use smtp::{EmailConfig, SmtpMailer};

/// Error type for email delivery failures. All variants are transient from
/// the caller's point of view; nothing retries synchronously.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Templates the platform sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailType {
    /// Sent after sign-up; carries the email confirmation link.
    Registration,
}

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct MailPayload {
    pub username: String,
    pub confirmation_url: String,
}

impl EmailType {
    pub fn subject(&self) -> &'static str {
        match self {
            EmailType::Registration => "[Obminyashka] Confirm your email",
        }
    }

    /// Render the plain-text body for this template.
    pub fn render(&self, payload: &MailPayload) -> String {
        match self {
            EmailType::Registration => format!(
                "Hi {},\n\nWelcome to Obminyashka! Confirm your email address by opening:\n\n{}\n\n\
                 If you did not sign up, ignore this message.",
                payload.username, payload.confirmation_url
            ),
        }
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        email_type: EmailType,
        payload: &MailPayload,
    ) -> Result<(), MailError>;
}

/// Mailer that records the send in the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(
        &self,
        to: &str,
        email_type: EmailType,
        payload: &MailPayload,
    ) -> Result<(), MailError> {
        tracing::info!(
            to,
            ?email_type,
            url = %payload.confirmation_url,
            "SMTP not configured; email logged instead of sent"
        );
        Ok(())
    }
}
