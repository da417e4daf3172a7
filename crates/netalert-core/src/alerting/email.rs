//! SMTP email sender

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::EmailConfig;
use crate::error::{Error, Result};

use super::dispatcher::SUBJECT_PREFIX;
use super::notifier::{ChannelSender, SendError};

/// Sends plain-text mail through a STARTTLS relay
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailSender {
    /// Create a sender; no connection is made until the first send
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| {
                Error::config(format!("invalid SMTP relay '{}': {e}", config.smtp_host))
            })?
            .port(config.smtp_port)
            .timeout(Some(timeout));

        if !config.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_email.clone(),
        })
    }

    fn build_message(
        &self,
        to: &str,
        subject: Option<&str>,
        body: &str,
    ) -> std::result::Result<Message, SendError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| SendError::Address(format!("from '{}': {e}", self.from)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| SendError::Address(format!("to '{to}': {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject.unwrap_or(SUBJECT_PREFIX))
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::Message(e.to_string()))
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel_type(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        destination: &str,
        subject: Option<&str>,
        body: &str,
    ) -> std::result::Result<(), SendError> {
        let message = self.build_message(destination, subject, body)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::Smtp(e.to_string()))?;

        debug!(to = %destination, "Email notification sent");
        Ok(())
    }
}
