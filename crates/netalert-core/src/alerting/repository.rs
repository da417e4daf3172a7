//! PostgreSQL repository for alert configs, alert records and recipients

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::{
    AlertConfig, AlertConfigInput, AlertConfigSummary, AlertLevel, AlertRecord, ChannelKind,
    NewAlertRecord, Recipient, Role, SendStatus,
};

use super::store::{AlertConfigStore, AlertRecordStore, RecipientDirectory};

/// Repository for alert configs and records
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Create a new alert repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertConfigStore for AlertRepository {
    async fn create_config(&self, input: AlertConfigInput) -> Result<i64> {
        let channels_json = serde_json::to_value(&input.channels)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO alert_config
                (name, device_id, metric, threshold, comparison, channels, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.device_id)
        .bind(&input.metric)
        .bind(input.threshold)
        .bind(input.comparison.as_str())
        .bind(&channels_json)
        .bind(input.enabled)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_config(&self, id: i64) -> Result<Option<AlertConfig>> {
        let row = sqlx::query_as::<_, AlertConfigRow>(
            r#"
            SELECT id, name, device_id, metric, threshold, comparison, channels, enabled
            FROM alert_config WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AlertConfig::try_from).transpose()
    }

    async fn list_configs(&self) -> Result<Vec<AlertConfigSummary>> {
        let rows = sqlx::query_as::<_, AlertConfigSummaryRow>(
            r#"
            SELECT id, name, device_id, metric, threshold, enabled
            FROM alert_config ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[async_trait]
impl AlertRecordStore for AlertRepository {
    async fn insert_record(&self, record: NewAlertRecord) -> Result<AlertRecord> {
        let channels_json = serde_json::to_value(&record.channels)?;

        let (id, create_time) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            INSERT INTO alert_record (
                alert_config_id, device_id, metric_value, alert_level,
                message, channels, send_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, create_time
            "#,
        )
        .bind(record.alert_config_id)
        .bind(&record.device_id)
        .bind(record.metric_value)
        .bind(record.alert_level.as_str())
        .bind(&record.message)
        .bind(&channels_json)
        .bind(record.send_status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(AlertRecord::from_new(id, record, create_time))
    }

    async fn list_records(&self, device_id: Option<&str>, limit: i64) -> Result<Vec<AlertRecord>> {
        let rows = sqlx::query_as::<_, AlertRecordRow>(
            r#"
            SELECT id, alert_config_id, device_id, metric_value, alert_level,
                   message, channels, send_status, create_time
            FROM alert_record
            WHERE ($1::TEXT IS NULL OR device_id = $1)
            ORDER BY create_time DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRecord::try_from).collect()
    }
}

#[async_trait]
impl RecipientDirectory for AlertRepository {
    async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT email, phone, role FROM users
            WHERE role IN ('admin', 'operator')
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// Database row types for mapping

#[derive(sqlx::FromRow)]
struct AlertConfigRow {
    id: i64,
    name: String,
    device_id: String,
    metric: String,
    threshold: f64,
    comparison: String,
    channels: serde_json::Value,
    enabled: bool,
}

impl TryFrom<AlertConfigRow> for AlertConfig {
    type Error = Error;

    fn try_from(row: AlertConfigRow) -> Result<Self> {
        let comparison = row.comparison.parse().map_err(|_| {
            Error::internal(format!(
                "alert_config {} has unknown comparison '{}'",
                row.id, row.comparison
            ))
        })?;

        Ok(AlertConfig {
            id: row.id,
            name: row.name,
            device_id: row.device_id,
            metric: row.metric,
            threshold: row.threshold,
            comparison,
            channels: decode_channels(row.channels)?,
            enabled: row.enabled,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AlertConfigSummaryRow {
    id: i64,
    name: String,
    device_id: String,
    metric: String,
    threshold: f64,
    enabled: bool,
}

impl From<AlertConfigSummaryRow> for AlertConfigSummary {
    fn from(row: AlertConfigSummaryRow) -> Self {
        AlertConfigSummary {
            id: row.id,
            name: row.name,
            device_id: row.device_id,
            metric: row.metric,
            threshold: row.threshold,
            enabled: row.enabled,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRecordRow {
    id: i64,
    alert_config_id: i64,
    device_id: String,
    metric_value: f64,
    alert_level: String,
    message: String,
    channels: serde_json::Value,
    send_status: String,
    create_time: DateTime<Utc>,
}

impl TryFrom<AlertRecordRow> for AlertRecord {
    type Error = Error;

    fn try_from(row: AlertRecordRow) -> Result<Self> {
        Ok(AlertRecord {
            id: row.id,
            alert_config_id: row.alert_config_id,
            device_id: row.device_id,
            metric_value: row.metric_value,
            alert_level: row.alert_level.parse::<AlertLevel>()?,
            message: row.message,
            channels: decode_channels(row.channels)?,
            send_status: row.send_status.parse::<SendStatus>()?,
            create_time: row.create_time,
        })
    }
}

/// Decode a stored channel list one entry at a time.
///
/// Entries that are not strings are kept as [`ChannelKind::Unknown`] so one bad
/// element never hides the rest of the list.
fn decode_channels(value: serde_json::Value) -> Result<Vec<ChannelKind>> {
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(tag) => ChannelKind::from(tag),
                other => ChannelKind::Unknown(other.to_string()),
            })
            .collect()),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(Error::internal(format!(
            "stored channels must be a JSON array, got {other}"
        ))),
    }
}

#[derive(sqlx::FromRow)]
struct RecipientRow {
    email: Option<String>,
    phone: Option<String>,
    role: String,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        let role = match row.role.as_str() {
            "admin" => Role::Admin,
            _ => Role::Operator,
        };

        Recipient {
            email: row.email,
            phone: row.phone,
            role,
        }
    }
}
