//! Repository for the `push_subscriptions` table.

use sqlx::PgPool;
use vplan_core::types::DbId;

use crate::models::push_subscription::{PushSubscription, UpsertPushSubscription};

const COLUMNS: &str = "id, endpoint, p256dh, auth, user_id, user_agent, last_seen_at, created_at";

/// Provides CRUD operations for browser push subscriptions.
pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Register a subscription, or refresh keys and owner of a known endpoint.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertPushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO push_subscriptions (endpoint, p256dh, auth, user_id, user_agent) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (endpoint) DO UPDATE SET \
                 p256dh       = EXCLUDED.p256dh, \
                 auth         = EXCLUDED.auth, \
                 user_id      = EXCLUDED.user_id, \
                 user_agent   = EXCLUDED.user_agent, \
                 last_seen_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(&input.endpoint)
            .bind(&input.p256dh)
            .bind(&input.auth)
            .bind(user_id)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// All subscriptions of one user, most recently seen first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE user_id = $1 \
             ORDER BY last_seen_at DESC"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a subscription by endpoint, scoped to its owner.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete_by_endpoint(
        pool: &PgPool,
        endpoint: &str,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1 AND user_id = $2")
                .bind(endpoint)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of subscriptions a user still has.
    pub async fn count_by_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM push_subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }
}
