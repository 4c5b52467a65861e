//! Repository for the `timetable_entries` table.

use sqlx::PgPool;
use vplan_core::timetable::TimetableEntry;
use vplan_core::types::DbId;

use crate::models::timetable_entry::TimetableEntryRow;

const COLUMNS: &str = "id, user_id, weekday, start_period, duration, subject_code, \
                       teacher_code, room, week_mode, created_at";

/// Provides read and replace operations for personal timetables.
pub struct TimetableEntryRepo;

impl TimetableEntryRepo {
    /// All entries of one user, in weekday/period order.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TimetableEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM timetable_entries
             WHERE user_id = $1
             ORDER BY array_position(ARRAY['MON','TUE','WED','THU','FRI'], weekday), start_period"
        );
        sqlx::query_as::<_, TimetableEntryRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a user's whole timetable with already validated entries.
    ///
    /// Runs in a transaction: either every entry is written or none is.
    pub async fn replace_for_user(
        pool: &PgPool,
        user_id: DbId,
        entries: &[TimetableEntry],
    ) -> Result<Vec<TimetableEntryRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM timetable_entries WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO timetable_entries \
                 (user_id, weekday, start_period, duration, subject_code, teacher_code, room, week_mode) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );

        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query_as::<_, TimetableEntryRow>(&query)
                .bind(user_id)
                .bind(entry.weekday.as_str())
                .bind(entry.start_period)
                .bind(entry.duration)
                .bind(&entry.subject_code)
                .bind(&entry.teacher_code)
                .bind(&entry.room)
                .bind(entry.week_mode.as_str())
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(rows)
    }
}
