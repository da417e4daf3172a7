//! Chat robot webhook sender (Enterprise WeChat, DingTalk)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::notifier::{ChannelSender, SendError};

/// Posts a text message to a chat robot webhook.
///
/// Both WeChat Work and DingTalk robots accept the same text payload, so one
/// sender serves either; the webhook URL is the destination.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    /// Create a new webhook sender
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    async fn send(
        &self,
        destination: &str,
        _subject: Option<&str>,
        body: &str,
    ) -> std::result::Result<(), SendError> {
        let payload = TextPayload {
            msgtype: "text",
            text: TextContent { content: body },
        };

        let response = self.client.post(destination).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status {
                channel: "webhook",
                status,
                body,
            });
        }

        debug!(url = %destination, "Webhook notification sent");
        Ok(())
    }
}

// Robot text message payload
#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    msgtype: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    content: &'a str,
}
