//! One-shot commands: list reminder candidates, or run a single dispatch pass.

use std::sync::Arc;

use miette::Result;
use tracing::warn;

use finplan_reminders::{
    DispatchReport, FixedClock, Item, JsonFileStore, NotificationSink, RefreshTask,
    ReminderError, Timestamp, TracingErrorReporter, Zone, calendar, trigger_instant,
};

use crate::settings::Settings;
use crate::sink::LogSink;

fn refresh_task(settings: &Settings, sink: Arc<LogSink>, at: Timestamp) -> RefreshTask {
    RefreshTask::new(
        Arc::new(JsonFileStore::new(&settings.items_path)),
        sink,
        Arc::new(settings.reminders.clone()),
        Arc::new(FixedClock::new(at)),
        Arc::new(TracingErrorReporter),
    )
}

/// One line per candidate: trigger instant, id, name and occurrence.
///
/// Candidates due at the hour containing `at` are marked with `*`. Trigger
/// instants are computed in `zone` and printed in its offset.
pub fn candidate_lines(
    candidates: &[Item],
    at: Timestamp,
    zone: Zone,
) -> Result<Vec<String>, ReminderError> {
    let slot = calendar::start_of_hour(at);
    candidates
        .iter()
        .map(|item| {
            let trigger = trigger_instant(item, zone)?;
            let marker = if trigger.is_some() && trigger == slot {
                '*'
            } else {
                ' '
            };
            let trigger = trigger
                .map(|t| t.format("%Y-%m-%d %H:%M %:z").to_string())
                .unwrap_or_default();
            Ok(format!(
                "{} {}  {}  {}  (occurs {})",
                marker,
                trigger,
                item.id,
                item.name,
                item.occurs_at.format("%Y-%m-%d")
            ))
        })
        .collect()
}

/// Run one dispatch pass at `at` against the configured items file.
pub fn check_at(
    settings: &Settings,
    at: Timestamp,
) -> Result<(Arc<LogSink>, DispatchReport), ReminderError> {
    let sink = Arc::new(LogSink::new());
    // The daemon's health check normally creates the category first
    if let Err(e) = sink.ensure_category(&settings.reminders.category()) {
        warn!(error = %e, "failed to create notification category");
    }
    let report = refresh_task(settings, sink.clone(), at).run_at(at)?;
    Ok((sink, report))
}

pub fn due(settings: &Settings, at: Timestamp) -> Result<()> {
    let candidates = refresh_task(settings, Arc::new(LogSink::new()), at)
        .candidates_at(at)
        .map_err(|e| miette::miette!("{}", e))?;
    let lines = candidate_lines(&candidates, at, settings.reminders.zone())
        .map_err(|e| miette::miette!("{}", e))?;

    if lines.is_empty() {
        println!("No reminders pending around {}", at.format("%Y-%m-%d %H:%M"));
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub fn check(settings: &Settings, at: Timestamp) -> Result<()> {
    let (_, report) = check_at(settings, at).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} due, {} delivered, {} failed{}",
        report.due,
        report.delivered.len(),
        report.failed,
        if report.summary_posted {
            ", summary posted"
        } else {
            ""
        }
    );
    Ok(())
}
