//! Channel sender contract shared by every notification medium

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ChannelsConfig;
use crate::error::Result;

use super::email::EmailSender;
use super::sms::SmsSender;
use super::webhook::WebhookSender;

/// A single delivery attempt over one medium.
///
/// Implementations never panic or block past their configured timeout; every
/// transport problem is reported as a [`SendError`].
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Short name used in logs and metrics
    fn channel_type(&self) -> &'static str;

    /// Deliver `body` to `destination` (an address, a phone number or a webhook URL)
    async fn send(
        &self,
        destination: &str,
        subject: Option<&str>,
        body: &str,
    ) -> std::result::Result<(), SendError>;
}

/// Senders used by the dispatcher, one per delivery mechanism
#[derive(Clone)]
pub struct ChannelSenders {
    /// Mail sender, called once per recipient address
    pub email: Arc<dyn ChannelSender>,
    /// Chat webhook sender shared by WeChat and DingTalk
    pub chat: Arc<dyn ChannelSender>,
    /// Text message sender, called once per recipient phone
    pub sms: Arc<dyn ChannelSender>,
}

impl ChannelSenders {
    /// Build the network-backed senders from configuration
    pub fn from_config(config: &ChannelsConfig) -> Result<Self> {
        Ok(Self {
            email: Arc::new(EmailSender::new(&config.email, config.timeout)?),
            chat: Arc::new(WebhookSender::new(config.timeout)?),
            sms: Arc::new(SmsSender::new(&config.sms, config.timeout)?),
        })
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{channel} returned {status}: {body}")]
    Status {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
