//! Calendar arithmetic on immutable timestamps.
//!
//! Every helper returns a new value. Most work on the wall clock of the
//! timestamp's own offset; [`local_hour_before`] works in a [`Zone`] so
//! daylight-saving transitions between two dates are honoured. `None` means
//! the result left chrono's representable range or the requested field was
//! out of bounds.

use std::fmt;
use std::ops::Range;

use chrono::offset::LocalResult;
use chrono::{
    Datelike, Days, Duration, Local, Months, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use chrono_tz::Tz;

use crate::Timestamp;

/// The time zone whose wall clock reminder hours are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The host's local zone.
    #[default]
    Local,
    /// A zone from the IANA database.
    Named(Tz),
}

impl Zone {
    /// Calendar date of `ts` on this zone's wall clock.
    pub fn date_of(&self, ts: Timestamp) -> NaiveDate {
        match self {
            Zone::Local => ts.with_timezone(&Local).date_naive(),
            Zone::Named(tz) => ts.with_timezone(tz).date_naive(),
        }
    }

    /// The instant a wall-clock time names in this zone.
    ///
    /// A time repeated by a backward shift resolves to its first occurrence.
    /// A time skipped by a forward shift resolves to the wall-clock time one
    /// hour later, which is the instant the gap closes for hour-aligned input.
    pub fn resolve(&self, local: NaiveDateTime) -> Option<Timestamp> {
        match self {
            Zone::Local => resolve_in(&Local, local),
            Zone::Named(tz) => resolve_in(tz, local),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

fn resolve_in<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> Option<Timestamp> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => Some(at.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.fixed_offset()),
        LocalResult::None => {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|at| at.fixed_offset())
        }
    }
}

/// `hour:00` on the wall clock of `zone`, `days` calendar days before the
/// date `ts` falls on in that zone.
pub fn local_hour_before(zone: Zone, ts: Timestamp, days: u32, hour: u32) -> Option<Timestamp> {
    let day = zone
        .date_of(ts)
        .checked_sub_days(Days::new(u64::from(days)))?;
    zone.resolve(day.and_hms_opt(hour, 0, 0)?)
}

/// Shift forward by whole calendar days.
pub fn add_days(ts: Timestamp, days: u32) -> Option<Timestamp> {
    ts.checked_add_days(Days::new(u64::from(days)))
}

/// Same calendar day at `hour:00:00.000`.
pub fn at_hour(ts: Timestamp, hour: u32) -> Option<Timestamp> {
    ts.with_hour(hour)?
        .with_minute(0)?
        .with_second(0)?
        .with_nanosecond(0)
}

/// Zero the minute, second and sub-second fields.
pub fn start_of_hour(ts: Timestamp) -> Option<Timestamp> {
    at_hour(ts, ts.hour())
}

/// The first top-of-hour strictly after `ts`.
pub fn next_top_of_hour(ts: Timestamp) -> Option<Timestamp> {
    start_of_hour(ts)?.checked_add_signed(Duration::hours(1))
}

/// Midnight on the first day of the month containing `ts`.
pub fn start_of_month(ts: Timestamp) -> Option<Timestamp> {
    at_hour(ts.with_day(1)?, 0)
}

/// Shift by whole calendar months, clamping the day to the target month's
/// length.
pub fn add_months(ts: Timestamp, months: u32) -> Option<Timestamp> {
    ts.checked_add_months(Months::new(months))
}

/// Half-open range covering the whole month containing `ts`.
pub fn month_range(ts: Timestamp) -> Option<Range<Timestamp>> {
    let start = start_of_month(ts)?;
    let end = add_months(start, 1)?;
    Some(start..end)
}

/// Whether two timestamps fall on the same calendar day in `a`'s offset.
pub fn same_day(a: Timestamp, b: Timestamp) -> bool {
    a.date_naive() == b.with_timezone(a.offset()).date_naive()
}
