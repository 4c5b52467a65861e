//! School calendar rules: weekdays, ISO week parity, lookahead windows and
//! the dispatch time window.
//!
//! Pure functions over `chrono` naive dates. Callers are responsible for
//! converting "now" into the school's local timezone before calling in.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::DateNumber;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest allowed per-user notification lookahead (school days).
pub const MIN_LOOKAHEAD_SCHOOL_DAYS: i16 = 1;

/// Largest allowed per-user notification lookahead (school days).
pub const MAX_LOOKAHEAD_SCHOOL_DAYS: i16 = 5;

/// First hour (inclusive, local time) at which scheduled dispatch runs fire.
pub const PUSH_WINDOW_START_HOUR: u32 = 6;

/// Hour (exclusive, local time) after which scheduled dispatch runs are skipped.
pub const PUSH_WINDOW_END_HOUR: u32 = 20;

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// A school day. Weekends are never school days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    /// All school days in calendar order.
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Canonical upper-case code, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Case-insensitive parse of `MON`..`FRI`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == upper)
            .ok_or_else(|| format!("Unknown weekday '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// WeekMode
// ---------------------------------------------------------------------------

/// Which calendar weeks a timetable entry takes place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeekMode {
    /// Every week.
    #[default]
    All,
    /// Weeks with an even ISO week number.
    Even,
    /// Weeks with an odd ISO week number.
    Odd,
}

impl WeekMode {
    pub const ALL_MODES: [WeekMode; 3] = [WeekMode::All, WeekMode::Even, WeekMode::Odd];

    /// Canonical upper-case code, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            WeekMode::All => "ALL",
            WeekMode::Even => "EVEN",
            WeekMode::Odd => "ODD",
        }
    }

    /// Whether two week modes can ever fall into the same week.
    ///
    /// `ALL` overlaps everything; `EVEN` and `ODD` only overlap themselves.
    pub fn overlaps(self, other: WeekMode) -> bool {
        match (self, other) {
            (WeekMode::All, _) | (_, WeekMode::All) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for WeekMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        WeekMode::ALL_MODES
            .into_iter()
            .find(|mode| mode.as_str() == upper)
            .ok_or_else(|| format!("Unknown week mode '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

/// Map a calendar date to its school weekday, or `None` on weekends.
pub fn weekday_from_date(date: NaiveDate) -> Option<Weekday> {
    match date.weekday() {
        chrono::Weekday::Mon => Some(Weekday::Mon),
        chrono::Weekday::Tue => Some(Weekday::Tue),
        chrono::Weekday::Wed => Some(Weekday::Wed),
        chrono::Weekday::Thu => Some(Weekday::Thu),
        chrono::Weekday::Fri => Some(Weekday::Fri),
        chrono::Weekday::Sat | chrono::Weekday::Sun => None,
    }
}

/// Whether a date falls on Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    weekday_from_date(date).is_none()
}

/// Whether the ISO-8601 week containing `date` has an even week number.
pub fn is_iso_week_even(date: NaiveDate) -> bool {
    date.iso_week().week() % 2 == 0
}

/// Whether an entry with the given week mode takes place in the week of `date`.
pub fn applies_to_week_mode(mode: WeekMode, date: NaiveDate) -> bool {
    match mode {
        WeekMode::All => true,
        WeekMode::Even => is_iso_week_even(date),
        WeekMode::Odd => !is_iso_week_even(date),
    }
}

/// Encode a date as `YYYYMMDD`.
pub fn to_date_number(date: NaiveDate) -> DateNumber {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Decode a `YYYYMMDD` number back into a date.
pub fn from_date_number(value: DateNumber) -> Option<NaiveDate> {
    let year = value / 10_000;
    let month = (value / 100) % 100;
    let day = value % 100;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Clamp a user's configured lookahead into the supported range.
pub fn clamp_lookahead(value: i16) -> i16 {
    value.clamp(MIN_LOOKAHEAD_SCHOOL_DAYS, MAX_LOOKAHEAD_SCHOOL_DAYS)
}

/// The next `count` school days strictly after `start`, skipping weekends.
///
/// `count` is clamped to the supported lookahead range first.
pub fn next_school_days(start: NaiveDate, count: i16) -> Vec<NaiveDate> {
    let target = clamp_lookahead(count) as usize;
    let mut result = Vec::with_capacity(target);
    let mut cursor = start;

    while result.len() < target {
        cursor = match cursor.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
        if !is_weekend(cursor) {
            result.push(cursor);
        }
    }

    result
}

/// Scheduling guard for non-forced dispatch runs.
///
/// Weekends are excluded entirely; on weekdays only local hours in
/// `[06:00, 20:00)` qualify.
pub fn is_push_window(local: NaiveDateTime) -> bool {
    if is_weekend(local.date()) {
        return false;
    }
    let hour = local.hour();
    (PUSH_WINDOW_START_HOUR..PUSH_WINDOW_END_HOUR).contains(&hour)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
