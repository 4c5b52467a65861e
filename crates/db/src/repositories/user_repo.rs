//! Repository for the `users` table.

use sqlx::PgPool;
use vplan_core::calendar::{clamp_lookahead, MIN_LOOKAHEAD_SCHOOL_DAYS};
use vplan_core::types::DbId;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, notifications_enabled, notification_lookahead_school_days, \
                       created_at, updated_at";

/// Provides the user queries the notifier needs.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let lookahead = clamp_lookahead(
            input
                .notification_lookahead_school_days
                .unwrap_or(MIN_LOOKAHEAD_SCHOOL_DAYS),
        );
        let query = format!(
            "INSERT INTO users (email, notifications_enabled, notification_lookahead_school_days)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(input.notifications_enabled)
            .bind(lookahead)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Users eligible for a dispatch run: notifications enabled, at least one
    /// timetable entry and at least one push subscription. Optionally
    /// restricted to a single user.
    pub async fn list_notification_candidates(
        pool: &PgPool,
        only_user: Option<DbId>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users u
             WHERE u.notifications_enabled = true
               AND ($1::BIGINT IS NULL OR u.id = $1)
               AND EXISTS (SELECT 1 FROM timetable_entries t WHERE t.user_id = u.id)
               AND EXISTS (SELECT 1 FROM push_subscriptions p WHERE p.user_id = u.id)
             ORDER BY u.id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(only_user)
            .fetch_all(pool)
            .await
    }

    /// Turn notifications on or off. Returns `true` if the row was updated.
    pub async fn set_notifications_enabled(
        pool: &PgPool,
        id: DbId,
        enabled: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET notifications_enabled = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
