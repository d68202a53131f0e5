//! Transaction reminders for FinPlan.
//!
//! This crate decides, on every hourly tick, which scheduled transactions are
//! due for a reminder and posts exactly one notification per due item:
//! - Loads candidate items one calendar month at a time
//! - Derives each item's trigger instant from its lead days and hour, on the
//!   wall clock of the user's time zone
//! - Unions the current and next month, de-duplicated by item identity
//! - Posts reminders under item-derived identities so redelivery overwrites
//! - Keeps the hourly wake-up armed through a periodic health check

pub mod cache;
pub mod calendar;
pub mod config;
pub mod dispatcher;
mod error;
pub mod guardian;
pub mod notify;
pub mod runtime;
pub mod selector;
pub mod store;
pub mod task;
pub mod trigger;
mod types;

pub use cache::{MonthCache, MonthWindow};
pub use calendar::Zone;
pub use config::{DEFAULT_DATE_FORMAT, Phrasing, ReminderConfig, RetryPolicy};
pub use dispatcher::{DispatchReport, TickDispatcher, content_text};
pub use error::{HostError, ReminderError, SinkError, StoreError};
pub use guardian::{
    ConflictPolicy, PeriodicRequest, PeriodicScheduler, ScheduleGuardian, WakeTimer, WakeToken,
    start_schedule_guardian,
};
pub use notify::{
    Category, GroupSummary, Importance, Notification, NotificationId, NotificationSink,
    NotificationTray, Shown,
};
pub use runtime::{TokioPeriodicScheduler, TokioWakeTimer};
pub use selector::ReminderSelector;
pub use store::{ItemStore, JsonFileStore, MemoryItemStore};
pub use task::{
    Clock, ErrorReporter, FixedClock, HealthCheckTask, RecordingReporter, RefreshTask,
    SystemClock, Task, TaskOutcome, TracingErrorReporter,
};
pub use trigger::trigger_instant;
pub use types::{Item, ItemId, NEVER_REMIND, Timestamp};
