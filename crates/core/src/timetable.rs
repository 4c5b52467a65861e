//! Personal timetable validation and conflict detection.
//!
//! A user's timetable is a set of recurring weekly entries. Before entries
//! become matchable they are normalized and checked here: malformed entries
//! are rejected with the offending 1-based index, and overlapping entries
//! (same weekday, intersecting periods, intersecting week parity) are
//! reported as conflicts unless overlaps are explicitly permitted.

use serde::{Deserialize, Serialize};

use crate::calendar::{WeekMode, Weekday};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// First valid period number.
pub const MIN_PERIOD: i16 = 1;

/// Last valid period number; no entry may extend past it.
pub const MAX_PERIOD: i16 = 16;

/// Shortest lesson, in periods.
pub const MIN_DURATION: i16 = 1;

/// Longest lesson, in periods.
pub const MAX_DURATION: i16 = 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A raw, unvalidated timetable entry as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimetableEntryInput {
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(default)]
    pub weekday: String,
    #[serde(default)]
    pub start_period: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub teacher_code: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub week_mode: Option<String>,
}

/// A normalized, matchable timetable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: Option<DbId>,
    pub weekday: Weekday,
    pub start_period: i16,
    pub duration: i16,
    pub subject_code: String,
    pub teacher_code: String,
    pub room: Option<String>,
    pub week_mode: WeekMode,
}

impl TimetableEntry {
    /// Last period occupied by this entry (inclusive).
    pub fn end_period(&self) -> i16 {
        self.start_period + self.duration - 1
    }

    /// All period numbers occupied by this entry, ascending.
    pub fn periods(&self) -> Vec<i16> {
        periods_for_entry(self.start_period, self.duration)
    }
}

/// Options for [`validate_entries`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Accept overlapping entries (used by quick-add flows).
    pub allow_overlaps: bool,
}

/// The side of a conflict, summarizing one colliding entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    /// 0-based position of the entry in the validated list.
    pub index: usize,
    pub id: Option<DbId>,
    pub subject_code: String,
    pub teacher_code: String,
    pub start_period: i16,
    pub duration: i16,
    pub week_mode: WeekMode,
}

/// A pair of entries that occupy the same period(s) in the same week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableConflict {
    pub weekday: Weekday,
    /// Period numbers occupied by both entries (intersection, ascending).
    pub periods: Vec<i16>,
    pub left: ConflictEntry,
    pub right: ConflictEntry,
}

/// Rejection reasons for a submitted timetable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimetableError {
    /// A single entry is malformed. `entry` is 1-based.
    #[error("Entry {entry}: {reason}")]
    InvalidEntry { entry: usize, reason: String },

    /// Entries collide and overlaps were not permitted.
    #[error("{}", describe_conflicts(.0))]
    Conflict(Vec<TimetableConflict>),
}

fn describe_conflicts(conflicts: &[TimetableConflict]) -> String {
    match conflicts.first() {
        Some(first) => format!(
            "Conflict on {}: period {} is double-booked ({} conflicting pair(s))",
            first.weekday,
            first.periods.first().copied().unwrap_or_default(),
            conflicts.len()
        ),
        None => "Conflicting timetable entries".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Trim and upper-case a subject/teacher/room code.
pub fn normalize_code(value: &str) -> String {
    value.trim().to_uppercase()
}

/// All period numbers occupied by a lesson starting at `start_period`.
pub fn periods_for_entry(start_period: i16, duration: i16) -> Vec<i16> {
    (0..duration.max(0)).map(|offset| start_period + offset).collect()
}

/// Validate and normalize a single raw entry. `index` is 0-based.
pub fn normalize_entry(
    input: &TimetableEntryInput,
    index: usize,
) -> Result<TimetableEntry, TimetableError> {
    let invalid = |reason: &str| TimetableError::InvalidEntry {
        entry: index + 1,
        reason: reason.to_string(),
    };

    let weekday: Weekday = input
        .weekday
        .parse()
        .map_err(|_| invalid("invalid weekday"))?;

    if input.start_period < MIN_PERIOD as i64 || input.start_period > MAX_PERIOD as i64 {
        return Err(invalid("start period must be between 1 and 16"));
    }
    let start_period = input.start_period as i16;

    if input.duration < MIN_DURATION as i64 || input.duration > MAX_DURATION as i64 {
        return Err(invalid("duration must be between 1 and 4"));
    }
    let duration = input.duration as i16;

    if start_period + duration - 1 > MAX_PERIOD {
        return Err(invalid("entry must not extend past period 16"));
    }

    let subject_code = normalize_code(&input.subject_code);
    if subject_code.is_empty() {
        return Err(invalid("subject code is missing"));
    }

    let teacher_code = normalize_code(&input.teacher_code);
    if teacher_code.is_empty() {
        return Err(invalid("teacher code is missing"));
    }

    let week_mode = match input.week_mode.as_deref() {
        None => WeekMode::All,
        Some(raw) => raw.parse().map_err(|_| invalid("invalid week mode"))?,
    };

    let room = input
        .room
        .as_deref()
        .map(str::trim)
        .filter(|room| !room.is_empty())
        .map(str::to_string);

    Ok(TimetableEntry {
        id: input.id,
        weekday,
        start_period,
        duration,
        subject_code,
        teacher_code,
        room,
        week_mode,
    })
}

/// Normalize every raw entry, failing on the first malformed one.
pub fn normalize_entries(
    inputs: &[TimetableEntryInput],
) -> Result<Vec<TimetableEntry>, TimetableError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| normalize_entry(input, index))
        .collect()
}

// ---------------------------------------------------------------------------
// Conflict detection
// ---------------------------------------------------------------------------

fn conflict_side(index: usize, entry: &TimetableEntry) -> ConflictEntry {
    ConflictEntry {
        index,
        id: entry.id,
        subject_code: entry.subject_code.clone(),
        teacher_code: entry.teacher_code.clone(),
        start_period: entry.start_period,
        duration: entry.duration,
        week_mode: entry.week_mode,
    }
}

/// Enumerate every pair of colliding entries.
///
/// Two entries collide when they share a weekday, their week modes overlap,
/// and their period ranges intersect. Every unordered pair is reported once,
/// in input order, together with the exact set of shared periods.
pub fn find_conflicts(entries: &[TimetableEntry]) -> Vec<TimetableConflict> {
    let mut conflicts = Vec::new();

    for (i, left) in entries.iter().enumerate() {
        let left_periods = left.periods();

        for (offset, right) in entries[i + 1..].iter().enumerate() {
            let j = i + 1 + offset;

            if left.weekday != right.weekday || !left.week_mode.overlaps(right.week_mode) {
                continue;
            }

            let shared: Vec<i16> = left_periods
                .iter()
                .copied()
                .filter(|period| (right.start_period..=right.end_period()).contains(period))
                .collect();

            if !shared.is_empty() {
                conflicts.push(TimetableConflict {
                    weekday: left.weekday,
                    periods: shared,
                    left: conflict_side(i, left),
                    right: conflict_side(j, right),
                });
            }
        }
    }

    conflicts
}

/// Normalize a submitted timetable and enforce the no-overlap invariant.
///
/// Returns the normalized entries in input order. Fails with
/// [`TimetableError::InvalidEntry`] on a malformed entry, or with
/// [`TimetableError::Conflict`] listing every colliding pair when
/// `options.allow_overlaps` is false.
pub fn validate_entries(
    inputs: &[TimetableEntryInput],
    options: ValidationOptions,
) -> Result<Vec<TimetableEntry>, TimetableError> {
    let entries = normalize_entries(inputs)?;

    if !options.allow_overlaps {
        let conflicts = find_conflicts(&entries);
        if !conflicts.is_empty() {
            return Err(TimetableError::Conflict(conflicts));
        }
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn input(weekday: &str, start: i64, duration: i64, mode: &str) -> TimetableEntryInput {
        TimetableEntryInput {
            weekday: weekday.to_string(),
            start_period: start,
            duration,
            subject_code: "mat".to_string(),
            teacher_code: " abc ".to_string(),
            week_mode: Some(mode.to_string()),
            ..Default::default()
        }
    }

    // -- Normalization -----------------------------------------------------

    #[test]
    fn normalizes_codes_and_defaults() {
        let mut raw = input("mon", 1, 2, "all");
        raw.week_mode = None;
        raw.room = Some("   ".to_string());

        let entry = normalize_entry(&raw, 0).unwrap();
        assert_eq!(entry.weekday, Weekday::Mon);
        assert_eq!(entry.subject_code, "MAT");
        assert_eq!(entry.teacher_code, "ABC");
        assert_eq!(entry.week_mode, WeekMode::All);
        assert_eq!(entry.room, None);
    }

    #[test]
    fn rejects_duration_out_of_range() {
        for bad in [0, 5] {
            let err = normalize_entry(&input("MON", 1, bad, "ALL"), 2).unwrap_err();
            assert_matches!(err, TimetableError::InvalidEntry { entry: 3, .. });
        }
    }

    #[test]
    fn rejects_entry_past_last_period() {
        let err = normalize_entry(&input("MON", 15, 3, "ALL"), 0).unwrap_err();
        assert_eq!(err.to_string(), "Entry 1: entry must not extend past period 16");
    }

    #[test]
    fn rejects_unknown_weekday_and_mode() {
        assert!(normalize_entry(&input("SAT", 1, 1, "ALL"), 0).is_err());
        assert!(normalize_entry(&input("MON", 1, 1, "WEEKLY"), 0).is_err());
    }

    #[test]
    fn rejects_missing_codes() {
        let mut raw = input("MON", 1, 1, "ALL");
        raw.teacher_code = "  ".to_string();
        assert_matches!(
            normalize_entry(&raw, 0),
            Err(TimetableError::InvalidEntry { entry: 1, .. })
        );
    }

    // -- Conflicts ---------------------------------------------------------

    #[test]
    fn reports_intersection_of_periods() {
        let entries = normalize_entries(&[input("MON", 2, 3, "ALL"), input("MON", 4, 1, "ALL")])
            .unwrap();
        let conflicts = find_conflicts(&entries);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].weekday, Weekday::Mon);
        assert_eq!(conflicts[0].periods, vec![4]);
        assert_eq!(conflicts[0].left.index, 0);
        assert_eq!(conflicts[0].right.index, 1);
    }

    #[test]
    fn reports_every_colliding_pair() {
        let entries = normalize_entries(&[
            input("TUE", 1, 2, "ALL"),
            input("TUE", 2, 2, "EVEN"),
            input("TUE", 2, 1, "ODD"),
        ])
        .unwrap();
        let conflicts = find_conflicts(&entries);
        // ALL/EVEN and ALL/ODD collide; EVEN/ODD never do.
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].periods, vec![2]);
        assert_eq!((conflicts[0].left.index, conflicts[0].right.index), (0, 1));
        assert_eq!((conflicts[1].left.index, conflicts[1].right.index), (0, 2));
    }

    #[test]
    fn different_weekdays_never_collide() {
        let entries =
            normalize_entries(&[input("MON", 1, 4, "ALL"), input("TUE", 1, 4, "ALL")]).unwrap();
        assert!(find_conflicts(&entries).is_empty());
    }

    #[test]
    fn even_and_odd_do_not_collide() {
        let entries =
            normalize_entries(&[input("WED", 3, 2, "EVEN"), input("WED", 3, 2, "ODD")]).unwrap();
        assert!(find_conflicts(&entries).is_empty());
    }

    // -- validate_entries --------------------------------------------------

    #[test]
    fn valid_set_is_returned_unchanged() {
        let inputs = [input("MON", 1, 2, "ALL"), input("MON", 3, 2, "ALL")];
        let entries = validate_entries(&inputs, ValidationOptions::default()).unwrap();
        assert_eq!(entries, normalize_entries(&inputs).unwrap());
    }

    #[test]
    fn overlap_fails_without_permission() {
        let inputs = [input("FRI", 5, 2, "EVEN"), input("FRI", 6, 1, "ALL")];
        let err = validate_entries(&inputs, ValidationOptions::default()).unwrap_err();
        assert_matches!(&err, TimetableError::Conflict(list) if list.len() == 1);
        assert!(err.to_string().starts_with("Conflict on FRI: period 6"));
    }

    #[test]
    fn overlap_allowed_when_permitted() {
        let inputs = [input("FRI", 5, 2, "EVEN"), input("FRI", 6, 1, "ALL")];
        let options = ValidationOptions {
            allow_overlaps: true,
        };
        assert_eq!(validate_entries(&inputs, options).unwrap().len(), 2);
    }
}
