//! In-process store for development and tests

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::alerting::{AlertConfigStore, AlertRecordStore, RecipientDirectory};
use crate::error::Result;
use crate::models::{
    AlertConfig, AlertConfigInput, AlertConfigSummary, AlertRecord, NewAlertRecord, Recipient,
};

/// Keeps configs, records and recipients in memory. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    configs: Vec<AlertConfig>,
    records: Vec<AlertRecord>,
    recipients: Vec<Recipient>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose directory holds `recipients`
    pub fn with_recipients(recipients: Vec<Recipient>) -> Self {
        let store = Self::new();
        store.inner.lock().recipients = recipients;
        store
    }

    /// Append a directory entry
    pub fn add_recipient(&self, recipient: Recipient) {
        self.inner.lock().recipients.push(recipient);
    }
}

#[async_trait]
impl AlertConfigStore for MemoryStore {
    async fn create_config(&self, input: AlertConfigInput) -> Result<i64> {
        let mut inner = self.inner.lock();
        let id = inner.configs.last().map_or(1, |c| c.id + 1);

        inner.configs.push(AlertConfig {
            id,
            name: input.name,
            device_id: input.device_id,
            metric: input.metric,
            threshold: input.threshold,
            comparison: input.comparison,
            channels: input.channels,
            enabled: input.enabled,
        });

        Ok(id)
    }

    async fn get_config(&self, id: i64) -> Result<Option<AlertConfig>> {
        Ok(self.inner.lock().configs.iter().find(|c| c.id == id).cloned())
    }

    async fn list_configs(&self) -> Result<Vec<AlertConfigSummary>> {
        Ok(self
            .inner
            .lock()
            .configs
            .iter()
            .map(AlertConfigSummary::from)
            .collect())
    }
}

#[async_trait]
impl AlertRecordStore for MemoryStore {
    async fn insert_record(&self, record: NewAlertRecord) -> Result<AlertRecord> {
        let mut inner = self.inner.lock();
        let id = inner.records.last().map_or(1, |r| r.id + 1);

        let stored = AlertRecord::from_new(id, record, Utc::now());
        inner.records.push(stored.clone());

        Ok(stored)
    }

    async fn list_records(&self, device_id: Option<&str>, limit: i64) -> Result<Vec<AlertRecord>> {
        let inner = self.inner.lock();
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut records: Vec<AlertRecord> = inner
            .records
            .iter()
            .filter(|r| device_id.map_or(true, |d| r.device_id == d))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.create_time
                .cmp(&a.create_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        records.truncate(limit);

        Ok(records)
    }
}

#[async_trait]
impl RecipientDirectory for MemoryStore {
    async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        Ok(self.inner.lock().recipients.clone())
    }
}
