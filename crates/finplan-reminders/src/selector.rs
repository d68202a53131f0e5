//! Reminder candidate selection.
//!
//! Looks at the current and the next calendar month, unions what both
//! windows see and drops items that must not be reminded about.

use std::collections::HashSet;

use tracing::debug;

use crate::cache::MonthCache;
use crate::{Item, ItemId, ReminderError, Timestamp, calendar, trigger};

/// Picks the items that may need a reminder around `now`.
///
/// Owns its [`MonthCache`], so a selector must not be shared by passes
/// running at the same time.
pub struct ReminderSelector {
    cache: MonthCache,
}

impl ReminderSelector {
    pub fn new(cache: MonthCache) -> Self {
        Self { cache }
    }

    /// Compute reminder candidates among `all_items` for the month of `now`
    /// and the month after it.
    ///
    /// Each item appears at most once, identified by `id`. Items that never
    /// remind or are completed are excluded. The result is sorted by trigger
    /// instant, then id. Any store or calculator failure aborts the pass.
    #[tracing::instrument(skip_all, fields(now = %now, items = all_items.len()))]
    pub fn compute_due_candidates(
        &mut self,
        now: Timestamp,
        all_items: &[Item],
    ) -> Result<Vec<Item>, ReminderError> {
        let current_month = calendar::start_of_month(now)
            .ok_or(ReminderError::MonthOutOfRange { anchor: now })?;
        let next_month = calendar::add_months(current_month, 1).ok_or(
            ReminderError::MonthOutOfRange {
                anchor: current_month,
            },
        )?;

        let current_batch = self.load_batch(current_month, all_items)?;
        let next_batch = self.load_batch(next_month, all_items)?;

        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut keyed = Vec::new();
        for item in current_batch.into_iter().chain(next_batch) {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            if !item.wants_reminder() {
                continue;
            }
            if let Some(at) = trigger::trigger_instant(&item, self.cache.zone())? {
                keyed.push((at, item));
            }
        }

        keyed.sort_by(|(a_at, a), (b_at, b)| a_at.cmp(b_at).then_with(|| a.id.cmp(&b.id)));

        debug!(
            candidates = keyed.len(),
            distinct_seen = seen.len(),
            "computed reminder candidates"
        );
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }

    fn load_batch(
        &mut self,
        month: Timestamp,
        all_items: &[Item],
    ) -> Result<Vec<Item>, ReminderError> {
        self.cache.load(month)?;
        Ok(self.cache.select(all_items))
    }
}
