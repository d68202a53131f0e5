//! Notification sink for running without a desktop notifier.

use finplan_reminders::{
    Category, GroupSummary, Notification, NotificationSink, NotificationTray, SinkError,
};
use tracing::{debug, info};

/// Keeps notifications in a tray and logs each one as it is shown.
#[derive(Debug, Default)]
pub struct LogSink {
    tray: NotificationTray,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tray(&self) -> &NotificationTray {
        &self.tray
    }
}

impl NotificationSink for LogSink {
    fn ensure_category(&self, category: &Category) -> Result<(), SinkError> {
        if !self.tray.has_category(&category.id) {
            info!(
                category = %category.id,
                name = %category.name,
                importance = ?category.importance,
                "created notification category"
            );
        }
        self.tray.ensure_category(category)
    }

    fn post(&self, notification: &Notification) -> Result<(), SinkError> {
        let replaced = self.tray.post_reminder(notification)?;
        info!(
            id = %notification.id,
            title = %notification.title,
            body = %notification.body,
            replaced,
            "reminder"
        );
        Ok(())
    }

    fn post_group_summary(&self, summary: &GroupSummary) -> Result<(), SinkError> {
        self.tray.post_group_summary(summary)?;
        debug!(id = %summary.id, group = %summary.group_key, "group summary");
        Ok(())
    }
}
