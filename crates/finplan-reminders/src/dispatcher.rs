//! Tick dispatch.
//!
//! Matches candidate trigger instants against the current tick and posts
//! one reminder per match, followed by a single group summary.

use std::fmt::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{DEFAULT_DATE_FORMAT, Phrasing, ReminderConfig};
use crate::notify::{GroupSummary, Notification, NotificationId, NotificationSink};
use crate::{Item, Timestamp, calendar, trigger};

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Candidates whose trigger matched the tick.
    pub due: usize,
    /// Reminders the sink accepted, in posting order.
    pub delivered: Vec<NotificationId>,
    /// Due reminders that could not be posted.
    pub failed: usize,
    /// Whether the group summary was posted.
    pub summary_posted: bool,
}

/// Posts reminders for candidates due at a tick.
pub struct TickDispatcher {
    sink: Arc<dyn NotificationSink>,
    config: Arc<ReminderConfig>,
}

impl TickDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, config: Arc<ReminderConfig>) -> Self {
        Self { sink, config }
    }

    /// Post reminders for every candidate whose trigger instant equals `tick`
    /// with its minute, second and sub-second fields zeroed.
    ///
    /// Triggers are computed in the configured zone, so the comparison is
    /// between instants and the tick's own offset does not matter.
    ///
    /// Each item is posted independently; a rejected post is logged and does
    /// not stop the rest. The group summary is posted after all reminders and
    /// only when at least one was delivered.
    #[tracing::instrument(skip_all, fields(tick = %tick, candidates = candidates.len()))]
    pub fn dispatch(&self, tick: Timestamp, candidates: &[Item]) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(slot) = calendar::start_of_hour(tick) else {
            warn!("tick cannot be normalized to the hour, skipping dispatch");
            return report;
        };

        let zone = self.config.zone();
        for item in candidates {
            let at = match trigger::trigger_instant(item, zone) {
                Ok(Some(at)) => at,
                Ok(None) => continue,
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "skipping candidate with invalid reminder");
                    continue;
                }
            };
            if at != slot {
                continue;
            }

            report.due += 1;
            let notification = self.reminder_for(item, tick);
            match self.sink.post(&notification) {
                Ok(()) => {
                    debug!(item_id = %item.id, notification_id = %notification.id, "posted reminder");
                    report.delivered.push(notification.id);
                }
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "failed to post reminder");
                    report.failed += 1;
                }
            }
        }

        if !report.delivered.is_empty() {
            let summary = GroupSummary {
                id: NotificationId::group(self.config.group_summary_id),
                category_id: self.config.channel_id.clone(),
                group_key: self.config.group_key.clone(),
            };
            match self.sink.post_group_summary(&summary) {
                Ok(()) => report.summary_posted = true,
                Err(e) => warn!(error = %e, "failed to post reminder group summary"),
            }
        }

        if report.due > 0 {
            info!(
                due = report.due,
                delivered = report.delivered.len(),
                failed = report.failed,
                "dispatched reminders"
            );
        }
        report
    }

    fn reminder_for(&self, item: &Item, tick: Timestamp) -> Notification {
        Notification {
            id: NotificationId::for_item(&item.id),
            category_id: self.config.channel_id.clone(),
            title: item.name.clone(),
            body: content_text(&self.config.phrasing, item.occurs_at, tick),
            group_key: self.config.group_key.clone(),
            tap_request_code: self.config.tap_request_code,
            auto_cancel: true,
        }
    }
}

/// Body text for an item occurring at `occurs_at`, relative to the tick's day.
///
/// An unparseable `date_format` falls back to [`DEFAULT_DATE_FORMAT`].
pub fn content_text(phrasing: &Phrasing, occurs_at: Timestamp, tick: Timestamp) -> String {
    if calendar::same_day(tick, occurs_at) {
        return phrasing.today.clone();
    }
    if calendar::add_days(tick, 1).is_some_and(|tomorrow| calendar::same_day(tomorrow, occurs_at)) {
        return phrasing.tomorrow.clone();
    }

    let local = occurs_at.with_timezone(tick.offset());
    let mut text = String::new();
    if write!(text, "{}", local.format(&phrasing.date_format)).is_ok() {
        return text;
    }
    warn!(date_format = %phrasing.date_format, "invalid reminder date format, using default");
    local.format(DEFAULT_DATE_FORMAT).to_string()
}
