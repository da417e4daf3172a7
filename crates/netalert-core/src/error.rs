//! Error types for NetAlert

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type alias using NetAlert's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for NetAlert operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested alert configuration does not exist
    #[error("Alert config not found: {id}")]
    ConfigNotFound { id: i64 },

    /// Notifications were attempted but the alert record could not be written
    #[error("Alert record not persisted: {reason}")]
    PersistenceFailed {
        reason: String,
        /// Per-target outcomes of the sends that did go out
        results: BTreeMap<String, bool>,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Send results that were collected before the error, if any
    pub fn partial_results(&self) -> Option<&BTreeMap<String, bool>> {
        match self {
            Self::PersistenceFailed { results, .. } => Some(results),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}
