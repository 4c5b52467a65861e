//! Timetable entry model and conversion into the matchable domain type.

use serde::Serialize;
use sqlx::FromRow;
use vplan_core::calendar::{WeekMode, Weekday};
use vplan_core::timetable::TimetableEntry;
use vplan_core::types::{DbId, Timestamp};

/// A row from the `timetable_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimetableEntryRow {
    pub id: DbId,
    pub user_id: DbId,
    pub weekday: String,
    pub start_period: i16,
    pub duration: i16,
    pub subject_code: String,
    pub teacher_code: String,
    pub room: Option<String>,
    pub week_mode: String,
    pub created_at: Timestamp,
}

impl TimetableEntryRow {
    /// Convert into a domain entry.
    ///
    /// Fails only if the stored weekday or week mode is not a known code,
    /// which the table's CHECK constraints rule out.
    pub fn to_entry(&self) -> Result<TimetableEntry, String> {
        Ok(TimetableEntry {
            id: Some(self.id),
            weekday: self.weekday.parse::<Weekday>()?,
            start_period: self.start_period,
            duration: self.duration,
            subject_code: self.subject_code.clone(),
            teacher_code: self.teacher_code.clone(),
            room: self.room.clone(),
            week_mode: self.week_mode.parse::<WeekMode>()?,
        })
    }
}
