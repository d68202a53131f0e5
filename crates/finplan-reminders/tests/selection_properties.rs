//! Property tests for candidate selection and dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use proptest::prelude::*;

use finplan_reminders::{
    Item, MemoryItemStore, MonthCache, NEVER_REMIND, NotificationSink, NotificationTray,
    ReminderConfig, ReminderSelector, TickDispatcher, Timestamp, Zone, calendar, trigger_instant,
};

fn base() -> Timestamp {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00+00:00").unwrap()
}

const UTC: Zone = Zone::Named(Tz::UTC);

fn utc_config() -> ReminderConfig {
    ReminderConfig {
        time_zone: Some(Tz::UTC),
        ..ReminderConfig::default()
    }
}

/// Items spread over a year, with a mix of reminding, silent and completed ones.
fn arb_item(id: usize) -> impl Strategy<Value = Item> {
    (
        0i64..365 * 24,
        prop_oneof![Just(NEVER_REMIND), 0i32..10],
        0u32..24,
        prop::bool::weighted(0.2),
    )
        .prop_map(move |(hours, lead, hour, completed)| {
            let mut item = Item::new(
                format!("item-{}", id),
                format!("Item {}", id),
                base() + Duration::hours(hours),
                lead,
                hour,
            );
            item.completed = completed;
            item
        })
}

fn arb_items() -> impl Strategy<Value = Vec<Item>> {
    (0usize..30).prop_flat_map(|n| (0..n).map(arb_item).collect::<Vec<_>>())
}

fn arb_now() -> impl Strategy<Value = Timestamp> {
    (0i64..365 * 24).prop_map(|hours| base() + Duration::hours(hours))
}

fn select(items: &[Item], now: Timestamp) -> Vec<Item> {
    let store = Arc::new(MemoryItemStore::new(items.to_vec()));
    let mut selector = ReminderSelector::new(MonthCache::new(store, UTC));
    selector.compute_due_candidates(now, items).unwrap()
}

proptest! {
    #[test]
    fn selection_has_no_duplicates(items in arb_items(), now in arb_now()) {
        let selected = select(&items, now);
        let ids: HashSet<_> = selected.iter().map(|i| i.id.clone()).collect();
        prop_assert_eq!(ids.len(), selected.len());
    }

    #[test]
    fn selection_excludes_silent_and_completed(items in arb_items(), now in arb_now()) {
        for item in select(&items, now) {
            prop_assert!(item.lead_days != NEVER_REMIND);
            prop_assert!(!item.completed);
        }
    }

    #[test]
    fn selection_is_ordered_by_trigger(items in arb_items(), now in arb_now()) {
        let triggers: Vec<_> = select(&items, now)
            .iter()
            .map(|i| trigger_instant(i, UTC).unwrap())
            .collect();
        prop_assert!(triggers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn due_items_are_always_selected(items in arb_items(), now in arb_now()) {
        let tick = calendar::start_of_hour(now).unwrap();
        let selected: HashSet<_> = select(&items, now).into_iter().map(|i| i.id).collect();

        for item in items.iter().filter(|i| i.wants_reminder()) {
            if trigger_instant(item, UTC).unwrap() == Some(tick) {
                prop_assert!(selected.contains(&item.id), "missing {}", item.id);
            }
        }
    }

    #[test]
    fn dispatch_is_idempotent(items in arb_items(), now in arb_now()) {
        let config = Arc::new(utc_config());
        let tray = Arc::new(NotificationTray::new());
        tray.ensure_category(&config.category()).unwrap();
        let dispatcher = TickDispatcher::new(tray.clone(), config);
        let candidates = select(&items, now);

        let first = dispatcher.dispatch(now, &candidates);
        let shown = tray.shown();
        let second = dispatcher.dispatch(now, &candidates);

        prop_assert_eq!(first, second);
        prop_assert_eq!(shown, tray.shown());
    }
}
