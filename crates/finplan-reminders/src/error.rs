//! Error types for reminder computation and dispatch.

use std::path::PathBuf;

use thiserror::Error;

use crate::{ItemId, Timestamp};

/// Errors from the item store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the backing file failed.
    #[error("failed to read items from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing data could not be decoded.
    #[error("failed to parse items: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store is temporarily unavailable.
    #[error("item store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a reminder selection pass.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The item store could not return items.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An item carries a lead time or hour the calculator cannot use.
    #[error("invalid item {id}: {reason}")]
    InvalidItem { id: ItemId, reason: String },

    /// Calendar arithmetic left the representable range.
    #[error("time out of range while computing reminder for {id}")]
    TimeOutOfRange { id: ItemId },

    /// The month window around an anchor could not be computed.
    #[error("month window around {anchor} is out of range")]
    MonthOutOfRange { anchor: Timestamp },
}

impl ReminderError {
    /// Store failures are transient; everything else is a data defect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReminderError::Store(_))
    }
}

/// Errors from the notification sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// The sink refused a specific notification.
    #[error("notification {id} rejected: {reason}")]
    Rejected { id: String, reason: String },

    /// The sink cannot accept anything right now.
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the host timer and job scheduler.
#[derive(Debug, Error)]
pub enum HostError {
    /// Arming the wake-up timer failed.
    #[error("timer error: {0}")]
    Timer(String),

    /// Registering a periodic job failed.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// The notification category could not be created.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// The next wake-up instant could not be computed.
    #[error("could not compute next wake-up after {0}")]
    TimeOutOfRange(String),
}
