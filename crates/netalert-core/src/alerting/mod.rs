//! Alert dispatch for NetAlert
//!
//! Fans a triggered alert out over email, chat webhooks and SMS, and keeps an
//! append-only record of every attempt.

mod dispatcher;
mod email;
mod notifier;
mod repository;
mod sms;
mod store;
mod webhook;

pub use dispatcher::{AlertDispatcher, SUBJECT_PREFIX};
pub use email::EmailSender;
pub use notifier::{ChannelSender, ChannelSenders, SendError};
pub use repository::AlertRepository;
pub use sms::SmsSender;
pub use store::{AlertConfigStore, AlertRecordStore, RecipientDirectory};
pub use webhook::WebhookSender;
