//! Alert data models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Format used when rendering `create_time` for record listings
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Maximum number of records returned by a record listing
pub const RECORD_LIST_LIMIT: i64 = 50;

/// Notification medium an alert config can enable.
///
/// Stored configs may carry tags this build does not know about; those are
/// kept verbatim in [`ChannelKind::Unknown`] so they survive a round trip and
/// are skipped at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelKind {
    /// One mail per recipient with an email address
    Email,
    /// Enterprise WeChat robot webhook
    Wechat,
    /// DingTalk robot webhook
    Dingtalk,
    /// One text message per recipient with a phone number
    Sms,
    /// Unrecognised tag
    Unknown(String),
}

impl ChannelKind {
    /// Wire tag of the channel
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Wechat => "wechat",
            Self::Dingtalk => "dingtalk",
            Self::Sms => "sms",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for ChannelKind {
    fn from(tag: &str) -> Self {
        match tag {
            "email" => Self::Email,
            "wechat" => Self::Wechat,
            "dingtalk" => Self::Dingtalk,
            "sms" => Self::Sms,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ChannelKind {
    fn from(tag: String) -> Self {
        match Self::from(tag.as_str()) {
            Self::Unknown(_) => Self::Unknown(tag),
            known => known,
        }
    }
}

impl From<ChannelKind> for String {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator between a metric value and a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Comparison {
    /// Greater than
    #[default]
    #[serde(rename = ">")]
    Gt,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Greater than or equal to
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal to
    #[serde(rename = "<=")]
    Lte,
    /// Equal to
    #[serde(rename = "==")]
    Eq,
}

impl Comparison {
    /// Operator symbol as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "==",
        }
    }

    /// Check `value <op> threshold`
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Gte => value >= threshold,
            Self::Lte => value <= threshold,
            Self::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Gte),
            "<=" => Ok(Self::Lte),
            "==" => Ok(Self::Eq),
            other => Err(Error::validation(format!("unknown comparison operator '{other}'"))),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Unique identifier
    pub id: i64,

    /// Human-readable name
    pub name: String,

    /// Device this alert watches
    pub device_id: String,

    /// Monitored metric (e.g., "cpu_usage", "if_in_errors")
    pub metric: String,

    /// Threshold value
    pub threshold: f64,

    /// Comparison operator
    pub comparison: Comparison,

    /// Enabled channels, in dispatch order
    pub channels: Vec<ChannelKind>,

    /// Whether the config is enabled
    pub enabled: bool,
}

impl AlertConfig {
    /// Check if a value crosses this config's threshold
    pub fn is_breached(&self, value: f64) -> bool {
        self.comparison.evaluate(value, self.threshold)
    }
}

/// Input for creating a new alert config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfigInput {
    pub name: String,
    pub device_id: String,
    pub metric: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AlertConfigInput {
    /// Validate required fields and collapse duplicate channels, keeping the first occurrence
    pub fn normalize(mut self) -> Result<Self> {
        for (field, value) in [
            ("name", &self.name),
            ("device_id", &self.device_id),
            ("metric", &self.metric),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{field} must not be empty")));
            }
        }

        if !self.threshold.is_finite() {
            return Err(Error::validation("threshold must be a finite number"));
        }

        let mut seen = Vec::with_capacity(self.channels.len());
        self.channels.retain(|kind| {
            if seen.contains(kind) {
                false
            } else {
                seen.push(kind.clone());
                true
            }
        });

        Ok(self)
    }
}

/// Projection returned by config listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfigSummary {
    pub id: i64,
    pub name: String,
    pub device_id: String,
    pub metric: String,
    pub threshold: f64,
    pub enabled: bool,
}

impl From<&AlertConfig> for AlertConfigSummary {
    fn from(config: &AlertConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            device_id: config.device_id.clone(),
            metric: config.metric.clone(),
            threshold: config.threshold,
            enabled: config.enabled,
        }
    }
}

/// Directory role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator
    Admin,
    /// Operations staff
    Operator,
}

impl Role {
    /// Role tag as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }
}

/// A directory entry eligible to receive alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

impl Recipient {
    /// Email address, if present and non-empty
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// Phone number, if present and non-empty
    pub fn phone_number(&self) -> Option<&str> {
        self.phone.as_deref().filter(|p| !p.is_empty())
    }
}

/// Severity recorded on an alert record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Message mentions "critical"
    Critical,
    /// Anything else
    Warning,
}

impl AlertLevel {
    /// Classify a message. Only the text matters, not the metric or threshold.
    pub fn from_message(message: &str) -> Self {
        if message.to_lowercase().contains("critical") {
            Self::Critical
        } else {
            Self::Warning
        }
    }

    /// Level tag as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
        }
    }
}

impl FromStr for AlertLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Self::Critical),
            "warning" => Ok(Self::Warning),
            other => Err(Error::internal(format!("unknown alert level '{other}'"))),
        }
    }
}

/// Aggregate outcome of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    /// At least one send succeeded
    Success,
    /// Nothing succeeded, including the case where nothing was attempted
    Failed,
}

impl SendStatus {
    /// Derive the aggregate status from per-target outcomes
    pub fn from_results(results: &BTreeMap<String, bool>) -> Self {
        if results.values().any(|ok| *ok) {
            Self::Success
        } else {
            Self::Failed
        }
    }

    /// Status tag as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for SendStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(Error::internal(format!("unknown send status '{other}'"))),
        }
    }
}

/// Alert record about to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlertRecord {
    pub alert_config_id: i64,
    pub device_id: String,
    pub metric_value: f64,
    pub alert_level: AlertLevel,
    pub message: String,
    /// Channel set of the config at dispatch time
    pub channels: Vec<ChannelKind>,
    pub send_status: SendStatus,
}

/// A persisted, immutable alert record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub alert_config_id: i64,
    pub device_id: String,
    pub metric_value: f64,
    pub alert_level: AlertLevel,
    pub message: String,
    pub channels: Vec<ChannelKind>,
    pub send_status: SendStatus,
    /// Assigned by the store
    pub create_time: DateTime<Utc>,
}

impl AlertRecord {
    /// Build the stored record from its pending form
    pub fn from_new(id: i64, record: NewAlertRecord, create_time: DateTime<Utc>) -> Self {
        Self {
            id,
            alert_config_id: record.alert_config_id,
            device_id: record.device_id,
            metric_value: record.metric_value,
            alert_level: record.alert_level,
            message: record.message,
            channels: record.channels,
            send_status: record.send_status,
            create_time,
        }
    }

    /// Projection used by record listings
    pub fn summary(&self) -> AlertRecordSummary {
        AlertRecordSummary {
            id: self.id,
            device_id: self.device_id.clone(),
            metric_value: self.metric_value,
            alert_level: self.alert_level,
            message: self.message.clone(),
            send_status: self.send_status,
            create_time: self.create_time.format(RECORD_TIME_FORMAT).to_string(),
        }
    }
}

/// Projection returned by record listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecordSummary {
    pub id: i64,
    pub device_id: String,
    pub metric_value: f64,
    pub alert_level: AlertLevel,
    pub message: String,
    pub send_status: SendStatus,
    pub create_time: String,
}

/// A triggered metric to notify about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub device_id: String,
    pub alert_config_id: i64,
    pub metric: String,
    pub metric_value: f64,
    pub message: Option<String>,
}

impl DispatchRequest {
    /// The caller's message, or the generated default.
    ///
    /// The value keeps its decimal point, so `97.0` renders as `97.0`.
    pub fn message_or_default(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!(
                "device {} metric {} abnormal: {:?}",
                self.device_id, self.metric, self.metric_value
            ),
        }
    }
}

/// Result of one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Per-target outcomes keyed as `email_{address}`, `sms_{phone}`, `wechat` or `dingtalk`
    pub results: BTreeMap<String, bool>,
    pub send_status: SendStatus,
    pub alert_level: AlertLevel,
    /// Id of the persisted alert record
    pub record_id: i64,
}

impl DispatchOutcome {
    /// Whether any target was reached
    pub fn is_success(&self) -> bool {
        self.send_status == SendStatus::Success
    }
}
