//! Database layer for NetAlert
//!
//! Provides the PostgreSQL connection pool and the in-process store, and
//! bundles whichever backend is configured behind the store traits.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresPool;

use std::sync::Arc;

use tracing::info;

use crate::alerting::{AlertConfigStore, AlertRecordStore, AlertRepository, RecipientDirectory};
use crate::config::DatabaseConfig;
use crate::error::Result;

/// Store handles shared by the dispatcher and the API
#[derive(Clone)]
pub struct Stores {
    /// Alert config store
    pub configs: Arc<dyn AlertConfigStore>,
    /// Alert record store
    pub records: Arc<dyn AlertRecordStore>,
    /// Recipient directory
    pub directory: Arc<dyn RecipientDirectory>,
}

impl Stores {
    /// Use one backend for all three roles
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AlertConfigStore + AlertRecordStore + RecipientDirectory + 'static,
    {
        Self {
            configs: store.clone(),
            records: store.clone(),
            directory: store,
        }
    }

    /// Open the configured backend, running migrations for PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.is_memory() {
            info!("Using in-memory store");
            return Ok(Self::shared(Arc::new(MemoryStore::new())));
        }

        let postgres = PostgresPool::new(config).await?;
        postgres.migrate().await?;
        info!("Connected to PostgreSQL");

        Ok(Self::shared(Arc::new(AlertRepository::new(
            postgres.pool().clone(),
        ))))
    }
}
