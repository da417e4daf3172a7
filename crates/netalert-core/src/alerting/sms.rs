//! SMS sender backed by an HTTP gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SmsConfig;
use crate::error::{Error, Result};

use super::notifier::{ChannelSender, SendError};

/// Sends text messages through a provider gateway.
///
/// Without a configured gateway the message is written to the log and counted
/// as delivered.
pub struct SmsSender {
    client: Client,
    gateway_url: Option<String>,
}

impl SmsSender {
    /// Create a new SMS sender
    pub fn new(config: &SmsConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone().filter(|url| !url.is_empty()),
        })
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel_type(&self) -> &'static str {
        "sms"
    }

    async fn send(
        &self,
        destination: &str,
        _subject: Option<&str>,
        body: &str,
    ) -> std::result::Result<(), SendError> {
        let Some(gateway_url) = &self.gateway_url else {
            info!(
                phone = %destination,
                message = %body,
                "SMS gateway not configured, message logged only"
            );
            return Ok(());
        };

        let payload = SmsPayload {
            phone: destination,
            message: body,
        };

        let response = self.client.post(gateway_url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status {
                channel: "sms",
                status,
                body,
            });
        }

        debug!(phone = %destination, "SMS notification sent");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SmsPayload<'a> {
    phone: &'a str,
    message: &'a str,
}
