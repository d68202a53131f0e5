//! Reminder types.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// An absolute point in time together with the wall-clock offset it was
/// observed in. Equality compares the absolute instant, not the offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Lead time value that disables reminding for an item.
pub const NEVER_REMIND: i32 = -1;

/// Stable identity of an item in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A scheduled financial item that may carry a reminder.
///
/// Owned by the item store; the reminder core only ever reads copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable identity, used for notification de-duplication.
    pub id: ItemId,
    /// Display label.
    pub name: String,
    /// When the underlying transaction happens.
    pub occurs_at: Timestamp,
    /// Days before `occurs_at` to remind, or [`NEVER_REMIND`].
    #[serde(default = "default_lead_days")]
    pub lead_days: i32,
    /// Hour of day (0-23) the reminder fires on the lead day.
    #[serde(default)]
    pub reminder_hour: u32,
    /// Completed items are never reminded about.
    #[serde(default)]
    pub completed: bool,
}

fn default_lead_days() -> i32 {
    NEVER_REMIND
}

impl Item {
    /// Create an item that reminds `lead_days` before `occurs_at` at `reminder_hour`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        occurs_at: Timestamp,
        lead_days: i32,
        reminder_hour: u32,
    ) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            occurs_at,
            lead_days,
            reminder_hour,
            completed: false,
        }
    }

    /// Whether reminding is disabled for this item.
    pub fn never_reminds(&self) -> bool {
        self.lead_days == NEVER_REMIND
    }

    /// Whether this item can produce a reminder at all.
    pub fn wants_reminder(&self) -> bool {
        !self.never_reminds() && !self.completed
    }
}
