//! Matching of substitution rows against a user's recurring timetable.
//!
//! For a target date, every processed substitution row is paired with every
//! timetable entry that is active on that date (weekday and week parity) and
//! whose periods overlap the row's hours. Subject or teacher must also match.
//! Duplicates are kept here; collapsing happens in the fingerprint step.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::calendar::{applies_to_week_mode, weekday_from_date};
use crate::substitution::{ProcessedSubstitution, SubstitutionType};
use crate::timetable::{TimetableEntry, MAX_PERIOD, MIN_PERIOD};

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("static regex is valid"));

/// How sure the matcher is that a row concerns the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    /// Room matches, or both subject and teacher match.
    High,
    Medium,
}

/// A substitution row paired with one timetable entry it affects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub entry: TimetableEntry,
    pub substitution: ProcessedSubstitution,
    pub subject_match: bool,
    pub teacher_match: bool,
    pub room_match: bool,
    pub confidence: MatchConfidence,
}

impl MatchResult {
    pub fn kind(&self) -> SubstitutionType {
        self.substitution.kind
    }
}

/// Extract the periods a provider hours cell refers to.
///
/// Numbers outside `1..=16` are ignored. A single number is one period; two
/// or more numbers describe the inclusive range between the first two
/// (`"3 - 4"` gives `[3, 4]`).
pub fn parse_periods_from_hours(hours: &str) -> Vec<i16> {
    let numbers: Vec<i16> = NUMBER_TOKEN
        .find_iter(hours)
        .filter_map(|m| m.as_str().parse::<i16>().ok())
        .filter(|n| (MIN_PERIOD..=MAX_PERIOD).contains(n))
        .collect();

    match numbers.as_slice() {
        [] => Vec::new(),
        [single] => vec![*single],
        [first, second, ..] => {
            let start = *first.min(second);
            let end = *first.max(second);
            (start..=end).collect()
        }
    }
}

/// Normalized, mutual-substring comparison of a cell against a code.
///
/// Empty values never match.
pub fn text_matches_code(source: &str, code: &str) -> bool {
    let source = source.trim().to_uppercase();
    let code = code.trim().to_uppercase();

    if source.is_empty() || code.is_empty() {
        return false;
    }

    source == code || source.contains(&code) || code.contains(&source)
}

/// Test a single row against a single entry for `date`.
pub fn match_substitution_to_entry(
    substitution: &ProcessedSubstitution,
    entry: &TimetableEntry,
    date: NaiveDate,
) -> Option<MatchResult> {
    if weekday_from_date(date)? != entry.weekday {
        return None;
    }
    if !applies_to_week_mode(entry.week_mode, date) {
        return None;
    }

    let entry_periods = entry.periods();
    let overlaps = parse_periods_from_hours(&substitution.hours)
        .iter()
        .any(|period| entry_periods.contains(period));
    if !overlaps {
        return None;
    }

    let subject_match = text_matches_code(&substitution.subject, &entry.subject_code);
    let teacher_match = text_matches_code(&substitution.teacher, &entry.teacher_code);
    if !subject_match && !teacher_match {
        return None;
    }

    let room_match = entry
        .room
        .as_deref()
        .is_some_and(|room| text_matches_code(&substitution.room, room));

    let confidence = if room_match || (subject_match && teacher_match) {
        MatchConfidence::High
    } else {
        MatchConfidence::Medium
    };

    Some(MatchResult {
        entry: entry.clone(),
        substitution: substitution.clone(),
        subject_match,
        teacher_match,
        room_match,
        confidence,
    })
}

/// Every (row, entry) overlap for `date`, sorted by type priority then hour.
///
/// One row may produce several results (double periods) and one entry may
/// be hit by several rows.
pub fn find_relevant_substitutions(
    date: NaiveDate,
    entries: &[TimetableEntry],
    substitutions: &[ProcessedSubstitution],
) -> Vec<MatchResult> {
    let mut matches: Vec<MatchResult> = substitutions
        .iter()
        .flat_map(|sub| {
            entries
                .iter()
                .filter_map(move |entry| match_substitution_to_entry(sub, entry, date))
        })
        .collect();

    // Stable sort keeps provider order for equal keys.
    matches.sort_by_key(|m| (m.kind(), m.substitution.sort_hour()));
    matches
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
