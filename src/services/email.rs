//! Outbound email.
//!
//! There is no SMTP relay; [`LogEmailSender`] writes each message to the
//! log so alert bookkeeping still runs end to end.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("email delivery failed: {0}")]
pub struct EmailError(pub String);

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email sent"
        );
        tracing::debug!(body = %message.body, "Email body");
        Ok(())
    }
}
