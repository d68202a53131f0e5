//! Month-scoped item cache.
//!
//! The cache holds the working set for exactly one calendar month. Loading a
//! month throws away whatever was there before; windows are never merged.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::calendar::Zone;
use crate::store::ItemStore;
use crate::{Item, ItemId, ReminderError, Timestamp, calendar, trigger};

/// Items visible from one calendar month.
#[derive(Debug, Clone)]
pub struct MonthWindow {
    range: Range<Timestamp>,
    items: Vec<Item>,
}

impl MonthWindow {
    /// First instant of the month.
    pub fn start(&self) -> Timestamp {
        self.range.start
    }

    /// First instant of the following month.
    pub fn end(&self) -> Timestamp {
        self.range.end
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

/// Loads and holds one [`MonthWindow`] at a time.
///
/// An item is visible from a month when either its event or its reminder
/// trigger falls inside that month, so an item whose reminder precedes a
/// month boundary is visible from both sides of it. Completed and
/// never-remind items have no trigger and are visible by event date only.
///
/// Not meant to be shared between concurrent passes; each pass builds its
/// own cache.
pub struct MonthCache {
    store: Arc<dyn ItemStore>,
    zone: Zone,
    window: Option<MonthWindow>,
}

impl MonthCache {
    /// Triggers are computed on the wall clock of `zone`.
    pub fn new(store: Arc<dyn ItemStore>, zone: Zone) -> Self {
        Self {
            store,
            zone,
            window: None,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Drop the current window.
    pub fn clear(&mut self) {
        self.window = None;
    }

    /// Replace the cache contents with the month containing `anchor`.
    ///
    /// `anchor` is normalized to midnight on the 1st, so any two instants in
    /// the same month load the same window. Store and calculator failures are
    /// returned unchanged and leave the cache empty.
    #[tracing::instrument(skip_all, fields(anchor = %anchor))]
    pub fn load(&mut self, anchor: Timestamp) -> Result<&MonthWindow, ReminderError> {
        self.clear();

        let range = calendar::month_range(anchor)
            .ok_or(ReminderError::MonthOutOfRange { anchor })?;

        let mut items = Vec::new();
        for item in self.store.fetch_all()? {
            let reminder_in_month = item.wants_reminder()
                && trigger::trigger_instant(&item, self.zone)?
                    .is_some_and(|at| range.contains(&at));
            if reminder_in_month || range.contains(&item.occurs_at) {
                items.push(item);
            }
        }

        debug!(month_start = %range.start, count = items.len(), "loaded month window");
        Ok(self.window.insert(MonthWindow { range, items }))
    }

    /// The loaded window, if any.
    pub fn window(&self) -> Option<&MonthWindow> {
        self.window.as_ref()
    }

    /// Entries of `all_items` whose identity is visible in the loaded window.
    ///
    /// Returns the caller's copies, not the cached ones. Empty when nothing
    /// is loaded.
    pub fn select(&self, all_items: &[Item]) -> Vec<Item> {
        let Some(window) = &self.window else {
            return Vec::new();
        };

        let visible: HashSet<&ItemId> = window.items.iter().map(|i| &i.id).collect();
        all_items
            .iter()
            .filter(|i| visible.contains(&i.id))
            .cloned()
            .collect()
    }
}
