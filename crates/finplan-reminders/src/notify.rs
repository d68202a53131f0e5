//! Notification sink boundary.
//!
//! Reminders are posted under an identity derived from the item, so posting
//! the same reminder twice replaces the first notification instead of adding
//! a second one.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{ItemId, SinkError};

/// Identity a notification is posted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    /// Identity of the reminder for an item. Depends only on the item.
    pub fn for_item(id: &ItemId) -> Self {
        Self(format!("reminder:{}", id))
    }

    /// Identity of a group summary.
    pub fn group(summary_id: i32) -> Self {
        Self(format!("group:{}", summary_id))
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How intrusively a category's notifications are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Default,
    High,
}

/// A notification category (channel) that notifications are posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub importance: Importance,
}

/// A per-item reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub category_id: String,
    pub title: String,
    pub body: String,
    pub group_key: String,
    /// Request code of the action that opens the app on tap.
    pub tap_request_code: i32,
    /// Dismiss on tap.
    pub auto_cancel: bool,
}

/// The aggregate notification standing for every reminder in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: NotificationId,
    pub category_id: String,
    pub group_key: String,
}

/// Where reminders are shown.
///
/// Implementations must replace an existing notification when one with the
/// same identity is posted again.
pub trait NotificationSink: Send + Sync {
    /// Create the category if it does not exist yet.
    fn ensure_category(&self, category: &Category) -> Result<(), SinkError>;

    /// Show or replace a reminder.
    fn post(&self, notification: &Notification) -> Result<(), SinkError>;

    /// Show or refresh the group summary.
    fn post_group_summary(&self, summary: &GroupSummary) -> Result<(), SinkError>;
}

/// Something currently visible in a [`NotificationTray`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Reminder(Notification),
    Summary(GroupSummary),
}

/// Visible notifications a [`NotificationTray`] keeps by default.
pub const DEFAULT_MAX_SHOWN: usize = 256;

/// Delivery history entries a [`NotificationTray`] keeps by default.
pub const DEFAULT_MAX_HISTORY: usize = 1024;

#[derive(Debug, Default)]
struct TrayState {
    categories: BTreeMap<String, Category>,
    /// Each entry carries the sequence number of its latest post.
    shown: BTreeMap<NotificationId, (u64, Shown)>,
    deliveries: VecDeque<NotificationId>,
    rejecting: HashSet<NotificationId>,
    next_seq: u64,
}

/// In-memory notification sink with overwrite-by-identity semantics.
///
/// Posting to a category that was never ensured is rejected. Both the
/// visible set and the delivery history are bounded: past the limit the
/// least recently posted notification is dismissed and the oldest delivery
/// record dropped.
#[derive(Debug)]
pub struct NotificationTray {
    state: Mutex<TrayState>,
    max_shown: usize,
    max_history: usize,
}

impl Default for NotificationTray {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SHOWN, DEFAULT_MAX_HISTORY)
    }
}

impl NotificationTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tray keeping at most `max_shown` visible notifications and
    /// `max_history` delivery records. Limits below one are raised to one.
    pub fn with_limits(max_shown: usize, max_history: usize) -> Self {
        Self {
            state: Mutex::new(TrayState::default()),
            max_shown: max_shown.max(1),
            max_history: max_history.max(1),
        }
    }

    /// Show or replace a reminder, returning whether one with the same
    /// identity was already visible.
    pub fn post_reminder(&self, notification: &Notification) -> Result<bool, SinkError> {
        self.accept(
            &notification.id,
            &notification.category_id,
            Shown::Reminder(notification.clone()),
        )
    }

    /// Reject every future post under `id`.
    pub fn reject(&self, id: NotificationId) {
        self.lock().rejecting.insert(id);
    }

    /// Notifications currently visible, ordered by identity.
    pub fn shown(&self) -> Vec<Shown> {
        self.lock()
            .shown
            .values()
            .map(|(_, shown)| shown.clone())
            .collect()
    }

    /// Number of visible notifications, summaries included.
    pub fn len(&self) -> usize {
        self.lock().shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &NotificationId) -> Option<Shown> {
        self.lock().shown.get(id).map(|(_, shown)| shown.clone())
    }

    /// Recent accepted posts in order, including overwrites.
    pub fn deliveries(&self) -> Vec<NotificationId> {
        self.lock().deliveries.iter().cloned().collect()
    }

    pub fn has_category(&self, id: &str) -> bool {
        self.lock().categories.contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept(
        &self,
        id: &NotificationId,
        category_id: &str,
        shown: Shown,
    ) -> Result<bool, SinkError> {
        let mut state = self.lock();
        if state.rejecting.contains(id) {
            return Err(SinkError::Rejected {
                id: id.to_string(),
                reason: "rejected by tray".to_string(),
            });
        }
        if !state.categories.contains_key(category_id) {
            return Err(SinkError::Rejected {
                id: id.to_string(),
                reason: format!("unknown category {}", category_id),
            });
        }

        state.deliveries.push_back(id.clone());
        while state.deliveries.len() > self.max_history {
            state.deliveries.pop_front();
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let replaced = state.shown.insert(id.clone(), (seq, shown)).is_some();
        while state.shown.len() > self.max_shown {
            let Some(oldest) = state
                .shown
                .iter()
                .min_by_key(|(_, (seq, _))| *seq)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            state.shown.remove(&oldest);
        }
        Ok(replaced)
    }
}

impl NotificationSink for NotificationTray {
    fn ensure_category(&self, category: &Category) -> Result<(), SinkError> {
        self.lock()
            .categories
            .entry(category.id.clone())
            .or_insert_with(|| category.clone());
        Ok(())
    }

    fn post(&self, notification: &Notification) -> Result<(), SinkError> {
        self.post_reminder(notification).map(|_| ())
    }

    fn post_group_summary(&self, summary: &GroupSummary) -> Result<(), SinkError> {
        self.accept(
            &summary.id,
            &summary.category_id,
            Shown::Summary(summary.clone()),
        )
        .map(|_| ())
    }
}
