//! Persistence seams used by the dispatcher and the API

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AlertConfig, AlertConfigInput, AlertConfigSummary, AlertRecord, NewAlertRecord, Recipient,
};

/// Named alert configurations
#[async_trait]
pub trait AlertConfigStore: Send + Sync {
    /// Insert a validated config and return its generated id
    async fn create_config(&self, input: AlertConfigInput) -> Result<i64>;

    /// Get a config by id
    async fn get_config(&self, id: i64) -> Result<Option<AlertConfig>>;

    /// List all configs as projections
    async fn list_configs(&self) -> Result<Vec<AlertConfigSummary>>;
}

/// Append-only alert record log
#[async_trait]
pub trait AlertRecordStore: Send + Sync {
    /// Append a record; the store assigns `id` and `create_time`
    async fn insert_record(&self, record: NewAlertRecord) -> Result<AlertRecord>;

    /// Newest records first, optionally for one device, at most `limit`
    async fn list_records(&self, device_id: Option<&str>, limit: i64) -> Result<Vec<AlertRecord>>;
}

/// Source of alert recipients
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// All users with the `admin` or `operator` role, in directory order
    async fn list_recipients(&self) -> Result<Vec<Recipient>>;
}
