//! In-process host for the wake-up timer and the periodic job queue.
//!
//! Tasks run on tokio's blocking pool, since item store fetches block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{debug, error, info, warn};

use crate::config::RetryPolicy;
use crate::guardian::{ConflictPolicy, PeriodicRequest, PeriodicScheduler, WakeTimer, WakeToken};
use crate::task::{Clock, Task, TaskOutcome};
use crate::{HostError, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run a task once on the blocking pool.
async fn run_blocking(task: Arc<dyn Task>) -> TaskOutcome {
    let name = task.name().to_string();
    match tokio::task::spawn_blocking(move || task.run()).await {
        Ok(outcome) => {
            debug!(task = %name, ?outcome, "task finished");
            outcome
        }
        Err(e) => {
            error!(task = %name, error = %e, "task panicked or was cancelled");
            TaskOutcome::Failure
        }
    }
}

/// Run a task, re-running it with backoff while it asks to be retried.
async fn run_with_retry(task: Arc<dyn Task>, retry: RetryPolicy) -> TaskOutcome {
    let mut attempt = 0;
    loop {
        match run_blocking(Arc::clone(&task)).await {
            TaskOutcome::Retry if retry.allows(attempt) => {
                let delay = retry.delay(attempt);
                warn!(
                    task = %task.name(),
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    "task asked for retry"
                );
                sleep(delay).await;
                attempt += 1;
            }
            TaskOutcome::Retry => {
                error!(task = %task.name(), attempts = attempt + 1, "giving up after retries");
                return TaskOutcome::Retry;
            }
            outcome => return outcome,
        }
    }
}

struct Alarm {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl Alarm {
    /// Armed and not yet fired.
    fn is_armed(&self) -> bool {
        !self.fired.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

/// [`WakeTimer`] backed by tokio sleeps.
///
/// Tasks are bound to tokens with [`register`](Self::register) before the
/// token is armed. Re-arming a token cancels the pending alarm; an alarm that
/// has already fired runs to completion.
pub struct TokioWakeTimer {
    handle: Handle,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    tasks: Mutex<HashMap<WakeToken, Arc<dyn Task>>>,
    alarms: Mutex<HashMap<WakeToken, Alarm>>,
}

impl TokioWakeTimer {
    pub fn new(handle: Handle, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            handle,
            clock,
            retry,
            tasks: Mutex::new(HashMap::new()),
            alarms: Mutex::new(HashMap::new()),
        }
    }

    /// Bind the task fired when `token` goes off.
    pub fn register(&self, token: WakeToken, task: Arc<dyn Task>) {
        lock(&self.tasks).insert(token, task);
    }

    /// Whether an alarm is pending for `token`.
    pub fn is_armed(&self, token: &WakeToken) -> bool {
        lock(&self.alarms).get(token).is_some_and(Alarm::is_armed)
    }

    /// Cancel every pending alarm.
    pub fn cancel_all(&self) {
        for (token, alarm) in lock(&self.alarms).drain() {
            if alarm.is_armed() {
                debug!(token = %token, "cancelled alarm");
                alarm.handle.abort();
            }
        }
    }
}

impl WakeTimer for TokioWakeTimer {
    fn arm(&self, at: Timestamp, token: &WakeToken) -> Result<(), HostError> {
        let task = lock(&self.tasks)
            .get(token)
            .cloned()
            .ok_or_else(|| HostError::Timer(format!("no task registered for {}", token)))?;

        let delay = (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
        let fired = Arc::new(AtomicBool::new(false));
        let retry = self.retry;

        let handle = {
            let fired = Arc::clone(&fired);
            let token = token.clone();
            self.handle.spawn(async move {
                sleep(delay).await;
                fired.store(true, Ordering::SeqCst);
                info!(token = %token, "wake-up fired");
                run_with_retry(task, retry).await;
            })
        };

        let previous = lock(&self.alarms).insert(token.clone(), Alarm { handle, fired });
        if let Some(previous) = previous.filter(Alarm::is_armed) {
            debug!(token = %token, "replaced pending alarm");
            previous.handle.abort();
        }

        debug!(token = %token, at = %at, delay_secs = delay.as_secs(), "alarm armed");
        Ok(())
    }
}

/// [`PeriodicScheduler`] running each job in its own tokio task.
///
/// The first run happens right after registration. A run asking for retry is
/// simply picked up again at the next interval.
pub struct TokioPeriodicScheduler {
    handle: Handle,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioPeriodicScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Names of jobs whose loop is still running.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.jobs)
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Stop every job loop.
    pub fn cancel_all(&self) {
        for (name, handle) in lock(&self.jobs).drain() {
            debug!(job = %name, "cancelled periodic job");
            handle.abort();
        }
    }
}

impl PeriodicScheduler for TokioPeriodicScheduler {
    fn register_periodic(&self, request: PeriodicRequest) -> Result<(), HostError> {
        if request.interval.is_zero() {
            return Err(HostError::Scheduler(format!(
                "job {} has a zero interval",
                request.name
            )));
        }

        let mut jobs = lock(&self.jobs);
        if let Some(existing) = jobs.get(&request.name).filter(|h| !h.is_finished()) {
            match request.policy {
                ConflictPolicy::Keep => {
                    debug!(job = %request.name, "periodic job already registered, keeping it");
                    return Ok(());
                }
                ConflictPolicy::CancelAndReplace => {
                    debug!(job = %request.name, "replacing periodic job");
                    existing.abort();
                }
            }
        }

        let PeriodicRequest {
            name,
            interval,
            task,
            ..
        } = request;

        let handle = {
            let name = name.clone();
            self.handle.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if run_blocking(Arc::clone(&task)).await == TaskOutcome::Retry {
                        warn!(job = %name, "periodic job failed, will run again next interval");
                    }
                }
            })
        };

        info!(job = %name, interval_secs = interval.as_secs(), "periodic job registered");
        jobs.insert(name, handle);
        Ok(())
    }
}
