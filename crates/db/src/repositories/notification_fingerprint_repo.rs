//! Repository for the `notification_fingerprints` history.

use sqlx::PgPool;
use vplan_core::types::{DateNumber, DbId};

use crate::models::notification_fingerprint::{NotificationFingerprint, RecordFingerprint};

const COLUMNS: &str = "id, user_id, target_date, fingerprint, match_count, sent_at";

/// Provides access to the per-(user, date) notification history.
pub struct NotificationFingerprintRepo;

impl NotificationFingerprintRepo {
    /// The most recently sent fingerprint for a user and date.
    pub async fn find_latest(
        pool: &PgPool,
        user_id: DbId,
        target_date: DateNumber,
    ) -> Result<Option<NotificationFingerprint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_fingerprints \
             WHERE user_id = $1 AND target_date = $2 \
             ORDER BY sent_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, NotificationFingerprint>(&query)
            .bind(user_id)
            .bind(target_date)
            .fetch_optional(pool)
            .await
    }

    /// Record a notified change-set.
    ///
    /// Idempotent: re-recording the same fingerprint bumps `sent_at` so it
    /// becomes the latest again (last writer wins).
    pub async fn upsert(
        pool: &PgPool,
        input: &RecordFingerprint,
    ) -> Result<NotificationFingerprint, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_fingerprints (user_id, target_date, fingerprint, match_count) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, target_date, fingerprint) DO UPDATE SET \
                 match_count = EXCLUDED.match_count, \
                 sent_at     = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationFingerprint>(&query)
            .bind(input.user_id)
            .bind(input.target_date)
            .bind(&input.fingerprint)
            .bind(input.match_count)
            .fetch_one(pool)
            .await
    }

    /// Forget every fingerprint for a user and date. Returns rows removed.
    pub async fn delete_for_date(
        pool: &PgPool,
        user_id: DbId,
        target_date: DateNumber,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notification_fingerprints WHERE user_id = $1 AND target_date = $2",
        )
        .bind(user_id)
        .bind(target_date)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
