//! # NetAlert
//!
//! Multi-channel alert dispatch for network device inspection.
//!
//! NetAlert takes a triggered device metric, resolves the named alert config,
//! notifies every enabled channel (email, WeChat/DingTalk robots, SMS) and
//! keeps an append-only record of each attempt.
//!
//! ## Architecture
//!
//! - **Alerting**: channel senders and the dispatch engine
//! - **Storage**: PostgreSQL via sqlx, or an in-process store
//! - **API**: REST API for dispatching and managing alert configs
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the API server
//! netalert serve
//!
//! # Dispatch an alert from the command line
//! netalert send --device D1 --config-id 1 --metric cpu_usage --value 97.5
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertDispatcher, ChannelSender, ChannelSenders};
    pub use crate::config::Config;
    pub use crate::db::{MemoryStore, Stores};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
