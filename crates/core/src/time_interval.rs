//! Named time intervals referenced by routes as mute-time/active-time
//! windows: a union of weekday, time-of-day, day-of-month, month, and
//! year ranges.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range over a bounded ordinal dimension
/// (minute-of-day, weekday, day-of-month, month, year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range<T> {
    pub start: T,
    pub end: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        value >= self.start && value < self.end
    }
}

/// A single "HH:MM"-"HH:MM" clock-time window, minutes since midnight.
pub type TimeRange = Range<u32>;
pub type WeekdayRange = Range<u8>;
pub type DayOfMonthRange = Range<i32>;
pub type MonthRange = Range<u32>;
pub type YearRange = Range<i32>;

/// One component of a time interval: all sub-fields present on a
/// component must hold simultaneously (conjunction); a field left empty
/// matches unconditionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeIntervalSpec {
    #[serde(default)]
    pub times: Vec<TimeRange>,
    #[serde(default)]
    pub weekdays: Vec<WeekdayRange>,
    #[serde(default)]
    pub days_of_month: Vec<DayOfMonthRange>,
    #[serde(default)]
    pub months: Vec<MonthRange>,
    #[serde(default)]
    pub years: Vec<YearRange>,
}

impl TimeIntervalSpec {
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let minute_of_day = now.hour() * 60 + now.minute();
        let weekday = weekday_ordinal(now.weekday());
        let day_of_month = now.day() as i32;
        let month = now.month();
        let year = now.year();

        field_matches(&self.times, minute_of_day)
            && field_matches(&self.weekdays, weekday)
            && field_matches(&self.days_of_month, day_of_month)
            && field_matches(&self.months, month)
            && field_matches(&self.years, year)
    }
}

fn field_matches<T: PartialOrd + Copy>(ranges: &[Range<T>], value: T) -> bool {
    ranges.is_empty() || ranges.iter().any(|r| r.contains(value))
}

fn weekday_ordinal(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// A named time interval: a union of [`TimeIntervalSpec`] components (any
/// one matching is sufficient).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeInterval {
    pub name: String,
    #[serde(default)]
    pub specs: Vec<TimeIntervalSpec>,
}

impl TimeInterval {
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.specs.iter().any(|s| s.contains(now))
    }
}
