//! Data models for NetAlert

mod alert;

pub use alert::*;
