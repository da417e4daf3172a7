//! Alert dispatch engine
//!
//! Resolves an alert config, fans the message out over every enabled channel,
//! and appends one alert record summarising the attempt.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ChannelsConfig;
use crate::db::Stores;
use crate::error::{Error, Result};
use crate::models::{
    AlertConfig, AlertLevel, ChannelKind, DispatchOutcome, DispatchRequest, NewAlertRecord,
    Recipient, SendStatus,
};

use super::notifier::{ChannelSender, ChannelSenders};
use super::store::{AlertConfigStore, AlertRecordStore, RecipientDirectory};

/// Prefix of the subject line on alert mail
pub const SUBJECT_PREFIX: &str = "[Network Inspection Alert]";

/// Dispatches triggered alerts to their configured channels
pub struct AlertDispatcher {
    configs: Arc<dyn AlertConfigStore>,
    records: Arc<dyn AlertRecordStore>,
    directory: Arc<dyn RecipientDirectory>,
    senders: ChannelSenders,
    channels: ChannelsConfig,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(stores: &Stores, senders: ChannelSenders, channels: &ChannelsConfig) -> Self {
        Self {
            configs: stores.configs.clone(),
            records: stores.records.clone(),
            directory: stores.directory.clone(),
            senders,
            channels: channels.clone(),
        }
    }

    /// Notify every enabled channel of `request.alert_config_id` and record the attempt.
    ///
    /// Sends run one at a time in channel order, then recipient order. A failed
    /// send is recorded as `false` and never stops the remaining sends. The
    /// `enabled` flag of the config is not consulted.
    ///
    /// Returns [`Error::ConfigNotFound`] without side effects when the config
    /// does not exist, and [`Error::PersistenceFailed`] (carrying the send
    /// results) when notifications went out but the record could not be written.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        let dispatch_id = Uuid::new_v4();

        let config = self
            .configs
            .get_config(request.alert_config_id)
            .await?
            .ok_or(Error::ConfigNotFound {
                id: request.alert_config_id,
            })?;

        let recipients = self.directory.list_recipients().await?;
        let message = request.message_or_default();

        info!(
            %dispatch_id,
            alert_config_id = config.id,
            device_id = %request.device_id,
            channels = config.channels.len(),
            recipients = recipients.len(),
            "Dispatching alert"
        );
        debug!(
            %dispatch_id,
            metric = %request.metric,
            value = request.metric_value,
            threshold = config.threshold,
            comparison = %config.comparison,
            breached = config.is_breached(request.metric_value),
            "Threshold comparison"
        );

        let results = self.fan_out(&config, &recipients, &message).await;

        let send_status = SendStatus::from_results(&results);
        let alert_level = AlertLevel::from_message(&message);

        let record = NewAlertRecord {
            alert_config_id: config.id,
            device_id: request.device_id.clone(),
            metric_value: request.metric_value,
            alert_level,
            message,
            channels: config.channels.clone(),
            send_status,
        };

        metrics::counter!("netalert_dispatches_total", "status" => send_status.as_str())
            .increment(1);

        let stored = match self.records.insert_record(record).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    %dispatch_id,
                    alert_config_id = config.id,
                    error = %e,
                    "Notifications attempted but alert record was not persisted"
                );
                return Err(Error::PersistenceFailed {
                    reason: e.to_string(),
                    results,
                });
            }
        };

        info!(
            %dispatch_id,
            record_id = stored.id,
            send_status = send_status.as_str(),
            alert_level = alert_level.as_str(),
            attempted = results.len(),
            "Alert dispatched"
        );

        Ok(DispatchOutcome {
            results,
            send_status,
            alert_level,
            record_id: stored.id,
        })
    }

    /// Attempt every channel/recipient combination and collect outcomes by key
    async fn fan_out(
        &self,
        config: &AlertConfig,
        recipients: &[Recipient],
        message: &str,
    ) -> BTreeMap<String, bool> {
        let subject = format!("{SUBJECT_PREFIX} {}", config.name);
        let mut results = BTreeMap::new();

        for kind in &config.channels {
            match kind {
                ChannelKind::Email => {
                    for address in recipients.iter().filter_map(Recipient::email_address) {
                        let ok = self
                            .attempt(&*self.senders.email, kind, address, Some(&subject), message)
                            .await;
                        results.insert(format!("email_{address}"), ok);
                    }
                }
                ChannelKind::Wechat | ChannelKind::Dingtalk => {
                    let ok = match self.channels.webhook_for(kind) {
                        Some(url) => {
                            self.attempt(&*self.senders.chat, kind, url, None, message)
                                .await
                        }
                        None => {
                            debug!(channel = %kind, "No webhook configured, skipping");
                            false
                        }
                    };
                    results.insert(kind.as_str().to_string(), ok);
                }
                ChannelKind::Sms => {
                    for phone in recipients.iter().filter_map(Recipient::phone_number) {
                        let ok = self
                            .attempt(&*self.senders.sms, kind, phone, None, message)
                            .await;
                        results.insert(format!("sms_{phone}"), ok);
                    }
                }
                ChannelKind::Unknown(tag) => {
                    debug!(channel = %tag, alert_config_id = config.id, "Ignoring unknown channel");
                }
            }
        }

        results
    }

    /// One send; failures are logged and reported as `false`
    async fn attempt(
        &self,
        sender: &dyn ChannelSender,
        kind: &ChannelKind,
        destination: &str,
        subject: Option<&str>,
        body: &str,
    ) -> bool {
        let ok = match sender.send(destination, subject, body).await {
            Ok(()) => {
                debug!(channel = %kind, sender = sender.channel_type(), "Notification sent");
                true
            }
            Err(e) => {
                warn!(
                    channel = %kind,
                    sender = sender.channel_type(),
                    error = %e,
                    "Notification failed"
                );
                false
            }
        };

        metrics::counter!(
            "netalert_sends_total",
            "channel" => kind.as_str().to_string(),
            "outcome" => if ok { "success" } else { "failed" }
        )
        .increment(1);

        ok
    }
}
