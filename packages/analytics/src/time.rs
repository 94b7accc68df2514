//! Calendar and time-of-day classification of timestamps.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike as _};
use crime_dash_analytics_models::{Period, TimeOfDay};

/// Calendar quarter (1-4) of `ts`.
#[must_use]
pub fn quarter_of(ts: &NaiveDateTime) -> u32 {
    ts.month().div_ceil(3)
}

/// Calendar month (1-12) of `ts`.
#[must_use]
pub fn month_of(ts: &NaiveDateTime) -> u32 {
    ts.month()
}

/// Week number counted from January 1st, where the first week is padded
/// by the weekday Jan 1 falls on (Sunday = 0).
#[must_use]
pub fn week_of_year<D: Datelike>(date: &D) -> u32 {
    let jan_1_offset = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map_or(0, |d| d.weekday().num_days_from_sunday());
    (date.ordinal() + jan_1_offset).div_ceil(7)
}

/// Time-of-day bucket of `ts`. Boundary hours belong to the later bucket.
#[must_use]
pub fn time_of_day_of(ts: &NaiveDateTime) -> TimeOfDay {
    match ts.hour() {
        6..=11 => TimeOfDay::Morning,
        12..=17 => TimeOfDay::Afternoon,
        18..=21 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

/// Whether `ts` falls inside `period`.
///
/// [`Period::All`] and [`Period::Unrecognized`] contain every timestamp.
#[must_use]
pub fn period_contains(period: &Period, ts: &NaiveDateTime) -> bool {
    match period {
        Period::All | Period::Unrecognized(_) => true,
        Period::Year(year) => ts.year() == *year,
        Period::Quarter { year, quarter } => ts.year() == *year && quarter_of(ts) == *quarter,
        Period::Month { year, month } => ts.year() == *year && month_of(ts) == *month,
    }
}
