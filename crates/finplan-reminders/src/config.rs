//! Reminder configuration.
//!
//! Built once at startup and passed to every component that needs it.

use std::time::Duration;

use chrono::format::{Item as FormatItem, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::Zone;
use crate::notify::{Category, Importance};

/// Settings shared by the selector, dispatcher, guardian and host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReminderConfig {
    /// Notification category every reminder is posted to.
    pub channel_id: String,
    /// Human-readable category name.
    pub channel_name: String,
    pub importance: Importance,
    /// Group that per-item reminders and the summary share.
    pub group_key: String,
    /// Fixed identity of the group summary notification.
    pub group_summary_id: i32,
    /// Token the exact wake-up alarm is armed under.
    pub wake_token: String,
    /// Request code the wake-up alarm is armed with.
    pub wake_request_code: i32,
    /// Request code attached to the tap action of each reminder.
    pub tap_request_code: i32,
    /// Unique name of the periodic health check.
    pub health_check_job: String,
    /// Seconds between health checks.
    pub health_check_interval_secs: u64,
    /// Name of the one-shot refresh-and-dispatch job.
    pub refresh_job: String,
    /// IANA zone reminder hours are read in. Unset means the host's zone.
    pub time_zone: Option<Tz>,
    pub phrasing: Phrasing,
    pub retry: RetryPolicy,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            channel_id: "channel_reminder".to_string(),
            channel_name: "Transaction reminder".to_string(),
            importance: Importance::High,
            group_key: "REMINDERS_GROUP".to_string(),
            group_summary_id: 0,
            wake_token: "reminders_wakeup".to_string(),
            wake_request_code: 1,
            tap_request_code: 2,
            health_check_job: "scheduling_reminders_check".to_string(),
            health_check_interval_secs: 30 * 60,
            refresh_job: "refreshing_reminders".to_string(),
            time_zone: None,
            phrasing: Phrasing::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ReminderConfig {
    /// The notification category reminders are posted to.
    pub fn category(&self) -> Category {
        Category {
            id: self.channel_id.clone(),
            name: self.channel_name.clone(),
            importance: self.importance,
        }
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    /// The zone trigger instants are computed in.
    pub fn zone(&self) -> Zone {
        self.time_zone.map_or(Zone::Local, Zone::Named)
    }
}

/// `chrono` format used for dates beyond tomorrow unless configured.
pub const DEFAULT_DATE_FORMAT: &str = "%-d %B";

/// Date-relative reminder body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Phrasing {
    /// Body when the item occurs on the tick's day.
    pub today: String,
    /// Body when the item occurs the day after the tick.
    pub tomorrow: String,
    /// `chrono` format string for every other date.
    pub date_format: String,
}

impl Default for Phrasing {
    fn default() -> Self {
        Self {
            today: "Today".to_string(),
            tomorrow: "Tomorrow".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl Phrasing {
    /// Whether `date_format` parses as a `chrono` format string.
    pub fn date_format_is_valid(&self) -> bool {
        !StrftimeItems::new(&self.date_format).any(|item| matches!(item, FormatItem::Error))
    }
}

/// Backoff applied by the host when a task asks to be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Attempts after the first run before giving up.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_secs: 300,
            max_delay_secs: 3600,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// Doubles per attempt: 5min, 10min, 20min, 40min, then capped at 1hr.
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay_secs.saturating_mul(1u64 << attempt.min(16));
        Duration::from_secs(backoff.min(self.max_delay_secs))
    }

    /// Whether retry number `attempt` (0-based) is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
