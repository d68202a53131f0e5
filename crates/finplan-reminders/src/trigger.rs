//! Reminder window calculation.

use crate::calendar::{self, Zone};
use crate::{Item, ReminderError, Timestamp};

/// Compute the instant an item's reminder should fire.
///
/// The result is `reminder_hour:00:00.000` on the wall clock of `zone`,
/// `lead_days` calendar days before the date `occurs_at` falls on in that
/// zone. The offset of the result is the one `zone` observes on the
/// reminder day, which may differ from the offset `occurs_at` carries.
///
/// Returns `Ok(None)` for items carrying [`NEVER_REMIND`](crate::NEVER_REMIND).
/// Any other negative lead time, or an hour outside 0-23, is an
/// [`ReminderError::InvalidItem`].
pub fn trigger_instant(item: &Item, zone: Zone) -> Result<Option<Timestamp>, ReminderError> {
    if item.never_reminds() {
        return Ok(None);
    }

    let lead_days = u32::try_from(item.lead_days).map_err(|_| ReminderError::InvalidItem {
        id: item.id.clone(),
        reason: format!("lead time {} days", item.lead_days),
    })?;

    if item.reminder_hour > 23 {
        return Err(ReminderError::InvalidItem {
            id: item.id.clone(),
            reason: format!("reminder hour {}", item.reminder_hour),
        });
    }

    calendar::local_hour_before(zone, item.occurs_at, lead_days, item.reminder_hour)
        .map(Some)
        .ok_or_else(|| ReminderError::TimeOutOfRange {
            id: item.id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NEVER_REMIND;
    use chrono::{DateTime, Timelike};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    const UTC: Zone = Zone::Named(Tz::UTC);
    const BERLIN: Zone = Zone::Named(Tz::Europe__Berlin);

    fn ts(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_lead_days_and_hour() {
        let item = Item::new("rent", "Rent", ts("2026-06-10T00:00:00Z"), 3, 9);
        let trigger = trigger_instant(&item, UTC).unwrap().unwrap();
        assert_eq!(trigger, ts("2026-06-07T09:00:00Z"));
        assert_eq!(trigger.minute(), 0);
        assert_eq!(trigger.second(), 0);
        assert_eq!(trigger.nanosecond(), 0);
    }

    #[test]
    fn test_lead_time_into_previous_month() {
        let item = Item::new("car", "Car loan", ts("2026-03-01T00:00:00Z"), 2, 8);
        let trigger = trigger_instant(&item, UTC).unwrap().unwrap();
        assert_eq!(trigger, ts("2026-02-27T08:00:00Z"));
    }

    #[test]
    fn test_event_clock_fields_are_discarded() {
        let item = Item::new("gym", "Gym", ts("2026-06-10T18:37:41.5+02:00"), 0, 7);
        assert_eq!(
            trigger_instant(&item, BERLIN).unwrap().unwrap(),
            ts("2026-06-10T07:00:00+02:00")
        );
    }

    #[test]
    fn test_hour_follows_zone_across_dst_change() {
        // Event recorded in summer time, reminder day still in winter time
        let item = Item::new("rent", "Rent", ts("2026-03-30T00:00:00+02:00"), 2, 9);
        let trigger = trigger_instant(&item, BERLIN).unwrap().unwrap();
        assert_eq!(trigger, ts("2026-03-28T09:00:00+01:00"));
        assert_eq!(trigger.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_event_date_is_read_in_zone() {
        // Late evening UTC is already the next day in Berlin
        let item = Item::new("card", "Card", ts("2026-06-09T22:30:00Z"), 1, 9);
        assert_eq!(
            trigger_instant(&item, BERLIN).unwrap().unwrap(),
            ts("2026-06-09T09:00:00+02:00")
        );
        assert_eq!(
            trigger_instant(&item, UTC).unwrap().unwrap(),
            ts("2026-06-08T09:00:00Z")
        );
    }

    #[test]
    fn test_hour_inside_spring_gap_fires_when_gap_ends() {
        let item = Item::new("gym", "Gym", ts("2026-03-30T12:00:00+02:00"), 1, 2);
        assert_eq!(
            trigger_instant(&item, BERLIN).unwrap().unwrap(),
            ts("2026-03-29T03:00:00+02:00")
        );
    }

    #[test]
    fn test_repeated_autumn_hour_fires_once_at_first() {
        let item = Item::new("gym", "Gym", ts("2026-10-25T12:00:00+01:00"), 0, 2);
        assert_eq!(
            trigger_instant(&item, BERLIN).unwrap().unwrap(),
            ts("2026-10-25T02:00:00+02:00")
        );
    }

    #[test]
    fn test_never_remind_has_no_trigger() {
        let item = Item::new("x", "X", ts("2026-06-10T00:00:00Z"), NEVER_REMIND, 9);
        assert!(trigger_instant(&item, UTC).unwrap().is_none());
    }

    #[test]
    fn test_other_negative_lead_is_invalid() {
        let item = Item::new("x", "X", ts("2026-06-10T00:00:00Z"), -4, 9);
        let err = trigger_instant(&item, UTC).unwrap_err();
        assert!(matches!(err, ReminderError::InvalidItem { .. }));
    }

    #[test]
    fn test_hour_out_of_range_is_invalid() {
        let item = Item::new("x", "X", ts("2026-06-10T00:00:00Z"), 1, 24);
        assert!(matches!(
            trigger_instant(&item, UTC),
            Err(ReminderError::InvalidItem { .. })
        ));
    }

    proptest! {
        // Trigger is always on the hour and never after the event's day
        #[test]
        fn trigger_is_hour_aligned(
            day_offset in 0i64..3650,
            lead_days in 0i32..400,
            hour in 0u32..24,
        ) {
            let occurs_at = ts("2024-01-01T00:00:00Z") + chrono::Duration::days(day_offset);
            let item = Item::new("p", "P", occurs_at, lead_days, hour);
            let trigger = trigger_instant(&item, UTC).unwrap().unwrap();

            prop_assert_eq!(trigger.hour(), hour);
            prop_assert_eq!(trigger.minute(), 0);
            prop_assert_eq!(trigger.second(), 0);
            prop_assert_eq!(trigger.nanosecond(), 0);
            prop_assert_eq!(
                (occurs_at.date_naive() - trigger.date_naive()).num_days(),
                i64::from(lead_days)
            );
        }
    }
}
