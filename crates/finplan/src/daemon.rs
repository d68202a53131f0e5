//! Daemon command: keeps hourly reminders running until interrupted.
//!
//! Wiring:
//! - An exact wake-up at each top of the hour runs the refresh task
//! - A periodic health check recreates the category and re-arms the wake-up
//! - Ctrl-C cancels both and exits

use std::sync::Arc;

use miette::Result;
use tokio::runtime::Handle;
use tracing::info;

use finplan_reminders::{
    Clock, ErrorReporter, HealthCheckTask, JsonFileStore, RefreshTask, ScheduleGuardian,
    SystemClock, TokioPeriodicScheduler, TokioWakeTimer, TracingErrorReporter,
    start_schedule_guardian,
};

use crate::settings::Settings;
use crate::sink::LogSink;

pub async fn run(settings: Settings) -> Result<()> {
    let config = Arc::new(settings.reminders);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingErrorReporter);
    let sink = Arc::new(LogSink::new());
    let store = Arc::new(JsonFileStore::new(settings.items_path));
    let handle = Handle::current();

    info!(items = %store.path().display(), "starting reminder daemon");

    let refresh = Arc::new(RefreshTask::new(
        store,
        sink.clone(),
        config.clone(),
        clock.clone(),
        reporter.clone(),
    ));

    let timer = Arc::new(TokioWakeTimer::new(handle.clone(), clock.clone(), config.retry));
    let guardian = ScheduleGuardian::new(sink, timer.clone(), config.clone());
    timer.register(guardian.wake_token(), refresh);

    let health_check = Arc::new(HealthCheckTask::new(
        guardian,
        &config,
        clock,
        reporter.clone(),
    ));
    let scheduler = TokioPeriodicScheduler::new(handle);
    if !start_schedule_guardian(&scheduler, health_check, &config, reporter.as_ref()) {
        return Err(miette::miette!("failed to start reminder health check"));
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("failed to listen for shutdown signal: {}", e))?;

    info!("shutting down reminder daemon");
    scheduler.cancel_all();
    timer.cancel_all();
    Ok(())
}
