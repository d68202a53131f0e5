//! Host-invoked tasks.
//!
//! The host scheduler calls [`Task::run`] and inspects the [`TaskOutcome`] to
//! decide whether to invoke the task again. Tasks never panic or propagate
//! errors to the host; failures go to the [`ErrorReporter`].

use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Local};
use tracing::{debug, error, warn};

use crate::cache::MonthCache;
use crate::calendar::Zone;
use crate::config::ReminderConfig;
use crate::dispatcher::{DispatchReport, TickDispatcher};
use crate::guardian::ScheduleGuardian;
use crate::notify::NotificationSink;
use crate::selector::ReminderSelector;
use crate::store::ItemStore;
use crate::{Item, ReminderError, Timestamp};

/// How a task run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Transient failure; the host should run the task again later.
    Retry,
    /// Permanent failure; retrying will not help.
    Failure,
}

/// A unit of work the host schedules.
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Run to completion. Blocking is allowed.
    fn run(&self) -> TaskOutcome;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in the machine's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// Manually controlled clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fire-and-forget sink for task failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn Error + 'static), context: &str);
}

/// Reports errors as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &(dyn Error + 'static), context: &str) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        error!(error = %error, causes = ?chain, "{}", context);
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    /// `(context, error message)` pairs in report order.
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &(dyn Error + 'static), context: &str) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((context.to_string(), error.to_string()));
    }
}

/// Fetches every item, selects reminder candidates and dispatches the ones
/// due at the current tick.
pub struct RefreshTask {
    store: Arc<dyn ItemStore>,
    zone: Zone,
    dispatcher: TickDispatcher,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn ErrorReporter>,
    name: String,
}

impl RefreshTask {
    pub fn new(
        store: Arc<dyn ItemStore>,
        sink: Arc<dyn NotificationSink>,
        config: Arc<ReminderConfig>,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            store,
            zone: config.zone(),
            name: config.refresh_job.clone(),
            dispatcher: TickDispatcher::new(sink, config),
            clock,
            reporter,
        }
    }

    /// Reminder candidates around `now`, without dispatching anything.
    ///
    /// Builds a fresh month cache, so concurrent calls never share one.
    pub fn candidates_at(&self, now: Timestamp) -> Result<Vec<Item>, ReminderError> {
        let all_items = self.store.fetch_all()?;
        let mut selector = ReminderSelector::new(MonthCache::new(Arc::clone(&self.store), self.zone));
        selector.compute_due_candidates(now, &all_items)
    }

    /// One refresh-and-dispatch pass for the tick `now`.
    pub fn run_at(&self, now: Timestamp) -> Result<DispatchReport, ReminderError> {
        let candidates = self.candidates_at(now)?;
        debug!(candidates = candidates.len(), "reminder candidates refreshed");
        Ok(self.dispatcher.dispatch(now, &candidates))
    }
}

impl Task for RefreshTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> TaskOutcome {
        match self.run_at(self.clock.now()) {
            Ok(_) => TaskOutcome::Success,
            Err(e) => {
                // Retries are bounded by the host's attempt budget
                warn!(
                    error = %e,
                    transient = e.is_retryable(),
                    "refresh pass aborted"
                );
                self.reporter
                    .report(&e, "Failed to update reminders and show notifications");
                TaskOutcome::Retry
            }
        }
    }
}

/// Periodic health check that keeps the wake-up armed.
pub struct HealthCheckTask {
    guardian: ScheduleGuardian,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn ErrorReporter>,
    name: String,
}

impl HealthCheckTask {
    pub fn new(
        guardian: ScheduleGuardian,
        config: &ReminderConfig,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            guardian,
            clock,
            reporter,
            name: config.health_check_job.clone(),
        }
    }
}

impl Task for HealthCheckTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> TaskOutcome {
        match self.guardian.health_check(self.clock.now()) {
            Ok(_) => TaskOutcome::Success,
            Err(e) => {
                self.reporter.report(&e, "Failed to re-arm reminder wake-up");
                TaskOutcome::Retry
            }
        }
    }
}
