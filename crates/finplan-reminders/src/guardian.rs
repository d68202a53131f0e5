//! Schedule guardian.
//!
//! Two timers cooperate to keep reminders flowing:
//! - an exact one-shot wake-up at the next top of the hour, which runs the
//!   refresh-and-dispatch task once and is then spent;
//! - a periodic health check that recreates the notification category and
//!   re-arms the wake-up, replacing any alarm already armed for it.
//!
//! A missed or killed wake-up is therefore restored by the next health check.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::ReminderConfig;
use crate::notify::NotificationSink;
use crate::task::{ErrorReporter, Task};
use crate::{HostError, Timestamp, calendar};

/// Logical purpose an exact wake-up is armed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WakeToken {
    pub name: String,
    pub request_code: i32,
}

impl WakeToken {
    pub fn new(name: impl Into<String>, request_code: i32) -> Self {
        Self {
            name: name.into(),
            request_code,
        }
    }
}

impl fmt::Display for WakeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.request_code)
    }
}

/// One-shot wake-up timer.
pub trait WakeTimer: Send + Sync {
    /// Fire the task bound to `token` once, at or after `at`.
    ///
    /// Arming a token that is already armed cancels the earlier alarm.
    fn arm(&self, at: Timestamp, token: &WakeToken) -> Result<(), HostError>;
}

/// What to do when a periodic job with the same name is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Cancel the existing registration and install the new one.
    CancelAndReplace,
    /// Leave the existing registration in place.
    Keep,
}

/// A request to run a task on a fixed cadence.
#[derive(Clone)]
pub struct PeriodicRequest {
    pub name: String,
    pub interval: Duration,
    pub policy: ConflictPolicy,
    pub task: Arc<dyn Task>,
}

impl fmt::Debug for PeriodicRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicRequest")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("policy", &self.policy)
            .field("task", &self.task.name())
            .finish()
    }
}

/// Host queue for periodic jobs.
pub trait PeriodicScheduler: Send + Sync {
    fn register_periodic(&self, request: PeriodicRequest) -> Result<(), HostError>;
}

/// Re-arms the exact wake-up on every health check.
pub struct ScheduleGuardian {
    sink: Arc<dyn NotificationSink>,
    timer: Arc<dyn WakeTimer>,
    config: Arc<ReminderConfig>,
}

impl ScheduleGuardian {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        timer: Arc<dyn WakeTimer>,
        config: Arc<ReminderConfig>,
    ) -> Self {
        Self {
            sink,
            timer,
            config,
        }
    }

    /// Token the wake-up is armed under.
    pub fn wake_token(&self) -> WakeToken {
        WakeToken::new(&self.config.wake_token, self.config.wake_request_code)
    }

    /// Ensure the reminder category exists and arm the wake-up for the next
    /// top of the hour after `now`. Returns the armed instant.
    #[tracing::instrument(skip_all, fields(now = %now))]
    pub fn health_check(&self, now: Timestamp) -> Result<Timestamp, HostError> {
        self.sink.ensure_category(&self.config.category())?;

        let next = calendar::next_top_of_hour(now)
            .ok_or_else(|| HostError::TimeOutOfRange(now.to_rfc3339()))?;
        let token = self.wake_token();
        self.timer.arm(next, &token)?;

        info!(next_wake = %next, token = %token, "armed reminder wake-up");
        Ok(next)
    }
}

/// Register the periodic health check, replacing any earlier registration.
///
/// Failures are reported rather than returned; returns whether registration
/// succeeded.
pub fn start_schedule_guardian(
    scheduler: &dyn PeriodicScheduler,
    health_check: Arc<dyn Task>,
    config: &ReminderConfig,
    reporter: &dyn ErrorReporter,
) -> bool {
    let request = PeriodicRequest {
        name: config.health_check_job.clone(),
        interval: config.health_check_interval(),
        policy: ConflictPolicy::CancelAndReplace,
        task: health_check,
    };

    match scheduler.register_periodic(request) {
        Ok(()) => {
            info!(
                job = %config.health_check_job,
                interval_secs = config.health_check_interval_secs,
                "registered reminder health check"
            );
            true
        }
        Err(e) => {
            error!(job = %config.health_check_job, "health check registration failed");
            reporter.report(&e, "Failed to start reminder health check");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::SinkError;
    use crate::notify::{Category, GroupSummary, Notification, NotificationTray};
    use crate::task::{RecordingReporter, TaskOutcome};
    use chrono::DateTime;

    fn ts(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[derive(Default)]
    struct RecordingTimer {
        armed: Mutex<Vec<(Timestamp, WakeToken)>>,
        fail: bool,
    }

    impl WakeTimer for RecordingTimer {
        fn arm(&self, at: Timestamp, token: &WakeToken) -> Result<(), HostError> {
            if self.fail {
                return Err(HostError::Timer("alarm service gone".to_string()));
            }
            self.armed.lock().unwrap().push((at, token.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        requests: Mutex<Vec<PeriodicRequest>>,
        fail: bool,
    }

    impl PeriodicScheduler for RecordingScheduler {
        fn register_periodic(&self, request: PeriodicRequest) -> Result<(), HostError> {
            if self.fail {
                return Err(HostError::Scheduler("queue unavailable".to_string()));
            }
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    struct NoopTask;

    impl Task for NoopTask {
        fn name(&self) -> &str {
            "noop"
        }

        fn run(&self) -> TaskOutcome {
            TaskOutcome::Success
        }
    }

    fn guardian(timer: Arc<RecordingTimer>) -> (Arc<NotificationTray>, ScheduleGuardian) {
        let tray = Arc::new(NotificationTray::new());
        let guardian = ScheduleGuardian::new(
            tray.clone(),
            timer,
            Arc::new(ReminderConfig::default()),
        );
        (tray, guardian)
    }

    #[test]
    fn test_health_check_arms_next_hour() {
        let timer = Arc::new(RecordingTimer::default());
        let (tray, guardian) = guardian(timer.clone());

        let next = guardian.health_check(ts("2026-06-07T08:31:12Z")).unwrap();

        assert_eq!(next, ts("2026-06-07T09:00:00Z"));
        assert!(tray.has_category("channel_reminder"));
        let armed = timer.armed.lock().unwrap();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].1, WakeToken::new("reminders_wakeup", 1));
    }

    #[test]
    fn test_repeated_checks_use_same_token() {
        let timer = Arc::new(RecordingTimer::default());
        let (_, guardian) = guardian(timer.clone());

        guardian.health_check(ts("2026-06-07T08:00:00Z")).unwrap();
        guardian.health_check(ts("2026-06-07T08:30:00Z")).unwrap();

        let armed = timer.armed.lock().unwrap();
        assert_eq!(armed[0], armed[1]);
    }

    #[test]
    fn test_timer_failure_propagates() {
        let timer = Arc::new(RecordingTimer {
            fail: true,
            ..Default::default()
        });
        let (_, guardian) = guardian(timer);

        let err = guardian.health_check(ts("2026-06-07T08:00:00Z")).unwrap_err();
        assert!(matches!(err, HostError::Timer(_)));
    }

    struct DownSink;

    impl NotificationSink for DownSink {
        fn ensure_category(&self, _category: &Category) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("notifier not running".to_string()))
        }

        fn post(&self, _notification: &Notification) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("notifier not running".to_string()))
        }

        fn post_group_summary(&self, _summary: &GroupSummary) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("notifier not running".to_string()))
        }
    }

    #[test]
    fn test_sink_failure_skips_arming() {
        let timer = Arc::new(RecordingTimer::default());
        let guardian = ScheduleGuardian::new(
            Arc::new(DownSink),
            timer.clone(),
            Arc::new(ReminderConfig::default()),
        );

        let err = guardian.health_check(ts("2026-06-07T08:00:00Z")).unwrap_err();
        assert!(matches!(err, HostError::Sink(SinkError::Unavailable(_))));
        assert!(timer.armed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_registers_with_cancel_and_replace() {
        let scheduler = RecordingScheduler::default();
        let reporter = RecordingReporter::default();
        let config = ReminderConfig::default();

        assert!(start_schedule_guardian(
            &scheduler,
            Arc::new(NoopTask),
            &config,
            &reporter
        ));

        let requests = scheduler.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "scheduling_reminders_check");
        assert_eq!(requests[0].interval, Duration::from_secs(1800));
        assert_eq!(requests[0].policy, ConflictPolicy::CancelAndReplace);
        assert!(reporter.reports().is_empty());
    }

    #[test]
    fn test_start_reports_registration_failure() {
        let scheduler = RecordingScheduler {
            fail: true,
            ..Default::default()
        };
        let reporter = RecordingReporter::default();

        assert!(!start_schedule_guardian(
            &scheduler,
            Arc::new(NoopTask),
            &ReminderConfig::default(),
            &reporter
        ));
        assert_eq!(reporter.reports().len(), 1);
        assert_eq!(reporter.reports()[0].0, "Failed to start reminder health check");
    }
}
