//! Calendar-date calculators: leave duration and follow-up date preview.
//!
//! Both operate on `NaiveDate` only. There is no time-of-day and no timezone,
//! so a date can never shift by one across a local midnight.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn is_weekday(date: NaiveDate) -> bool {
    !is_weekend(date.weekday())
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Weekdays in `start..=end`: five per whole week, then the leftover days
/// walked from `start`'s weekday.
fn count_weekdays(start: NaiveDate, end: NaiveDate) -> i64 {
    let days = (end - start).num_days() + 1;
    let mut count = days / 7 * 5;
    let mut day = start.weekday();
    for _ in 0..days % 7 {
        if !is_weekend(day) {
            count += 1;
        }
        day = day.succ();
    }
    count
}

/// Number of working days (Mon–Fri) in the inclusive range `start..=end`.
///
/// Half-day flags take 0.5 off when their boundary day is itself a weekday.
/// The end flag only applies to multi-day ranges, so a single day with both
/// flags set is one half-day rather than zero. An inverted range is 0.
pub fn weekday_span(start: NaiveDate, end: NaiveDate, half_start: bool, half_end: bool) -> f64 {
    if end < start {
        return 0.0;
    }

    let mut span = count_weekdays(start, end) as f64;
    if half_start && is_weekday(start) {
        span -= 0.5;
    }
    if half_end && start != end && is_weekday(end) {
        span -= 0.5;
    }
    span.max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

impl FromStr for IntervalUnit {
    type Err = String;

    /// Accepts the select-box values used across the dashboard ("day", "Weeks", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(IntervalUnit::Days),
            "week" | "weeks" => Ok(IntervalUnit::Weeks),
            "month" | "months" => Ok(IntervalUnit::Months),
            other => Err(format!("Unknown interval unit '{}'", other)),
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntervalUnit::Days => "days",
            IntervalUnit::Weeks => "weeks",
            IntervalUnit::Months => "months",
        };
        f.write_str(s)
    }
}

/// `reference + amount × unit`.
///
/// Month arithmetic overflows rather than clamps: the day-of-month is kept and
/// any surplus rolls into the following month, so Jan 31 + 1 month is Mar 3
/// (Mar 2 in a leap year). Returns `None` only outside chrono's date range.
pub fn offset_date(reference: NaiveDate, amount: i64, unit: IntervalUnit) -> Option<NaiveDate> {
    match unit {
        IntervalUnit::Days => reference.checked_add_signed(Duration::try_days(amount)?),
        IntervalUnit::Weeks => {
            reference.checked_add_signed(Duration::try_days(amount.checked_mul(7)?)?)
        }
        IntervalUnit::Months => {
            let month0 = i64::from(reference.month0()).checked_add(amount)?;
            let year = i64::from(reference.year()) + month0.div_euclid(12);
            let month = month0.rem_euclid(12) as u32 + 1;
            let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
            first.checked_add_signed(Duration::try_days(i64::from(reference.day0()))?)
        }
    }
}
