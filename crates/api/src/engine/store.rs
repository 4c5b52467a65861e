//! Persistence seam of the dispatch engine.
//!
//! [`DispatchStore`] lists exactly what one run reads and writes, keyed by
//! user id and date. [`PgDispatchStore`] implements it on top of the
//! repositories in `vplan_db`; tests substitute an in-memory store.

use async_trait::async_trait;
use sqlx::PgPool;
use vplan_core::timetable::TimetableEntry;
use vplan_core::types::{DateNumber, DbId};
use vplan_db::models::notification_fingerprint::RecordFingerprint;
use vplan_db::repositories::{
    NotificationFingerprintRepo, PushSubscriptionRepo, TimetableEntryRepo, UserRepo,
};
use vplan_events::PushTarget;

/// Errors raised by a [`DispatchStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row no longer satisfies the domain invariants.
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

/// A user due for a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: DbId,
    /// Raw lookahead preference; clamped by the engine.
    pub lookahead_school_days: i16,
}

/// What happened when a dead subscription was removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// A row was deleted.
    pub removed: bool,
    /// It was the user's last device, so notifications were switched off.
    pub notifications_disabled: bool,
}

#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Users with notifications enabled, a timetable and a device.
    async fn list_recipients(&self, only_user: Option<DbId>) -> Result<Vec<Recipient>, StoreError>;

    async fn load_timetable(&self, user_id: DbId) -> Result<Vec<TimetableEntry>, StoreError>;

    async fn list_devices(&self, user_id: DbId) -> Result<Vec<PushTarget>, StoreError>;

    /// Hash of the most recently notified change-set for (user, date).
    async fn latest_fingerprint(
        &self,
        user_id: DbId,
        target_date: DateNumber,
    ) -> Result<Option<String>, StoreError>;

    /// Idempotent; the recorded fingerprint becomes the latest.
    async fn record_fingerprint(
        &self,
        user_id: DbId,
        target_date: DateNumber,
        fingerprint: &str,
        match_count: usize,
    ) -> Result<(), StoreError>;

    /// Forget the notification history for (user, date). Returns rows removed.
    async fn clear_fingerprints(&self, user_id: DbId, target_date: DateNumber)
        -> Result<u64, StoreError>;

    /// Delete a subscription whose endpoint is gone; disables notifications
    /// when no device is left.
    async fn prune_subscription(&self, user_id: DbId, endpoint: &str)
        -> Result<PruneOutcome, StoreError>;
}

/// [`DispatchStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDispatchStore {
    pool: PgPool,
}

impl PgDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn list_recipients(&self, only_user: Option<DbId>) -> Result<Vec<Recipient>, StoreError> {
        let users = UserRepo::list_notification_candidates(&self.pool, only_user).await?;
        Ok(users
            .into_iter()
            .map(|user| Recipient {
                user_id: user.id,
                lookahead_school_days: user.notification_lookahead_school_days,
            })
            .collect())
    }

    async fn load_timetable(&self, user_id: DbId) -> Result<Vec<TimetableEntry>, StoreError> {
        let rows = TimetableEntryRepo::list_by_user(&self.pool, user_id).await?;
        rows.iter()
            .map(|row| {
                row.to_entry()
                    .map_err(|reason| StoreError::InvalidRow(format!("timetable entry {}: {reason}", row.id)))
            })
            .collect()
    }

    async fn list_devices(&self, user_id: DbId) -> Result<Vec<PushTarget>, StoreError> {
        let subscriptions = PushSubscriptionRepo::list_by_user(&self.pool, user_id).await?;
        Ok(subscriptions
            .into_iter()
            .map(|s| PushTarget {
                endpoint: s.endpoint,
                p256dh: s.p256dh,
                auth: s.auth,
            })
            .collect())
    }

    async fn latest_fingerprint(
        &self,
        user_id: DbId,
        target_date: DateNumber,
    ) -> Result<Option<String>, StoreError> {
        let latest = NotificationFingerprintRepo::find_latest(&self.pool, user_id, target_date).await?;
        Ok(latest.map(|row| row.fingerprint))
    }

    async fn record_fingerprint(
        &self,
        user_id: DbId,
        target_date: DateNumber,
        fingerprint: &str,
        match_count: usize,
    ) -> Result<(), StoreError> {
        let input = RecordFingerprint {
            user_id,
            target_date,
            fingerprint: fingerprint.to_string(),
            match_count: i32::try_from(match_count).unwrap_or(i32::MAX),
        };
        NotificationFingerprintRepo::upsert(&self.pool, &input).await?;
        Ok(())
    }

    async fn clear_fingerprints(
        &self,
        user_id: DbId,
        target_date: DateNumber,
    ) -> Result<u64, StoreError> {
        Ok(NotificationFingerprintRepo::delete_for_date(&self.pool, user_id, target_date).await?)
    }

    async fn prune_subscription(
        &self,
        user_id: DbId,
        endpoint: &str,
    ) -> Result<PruneOutcome, StoreError> {
        let removed = PushSubscriptionRepo::delete_by_endpoint(&self.pool, endpoint, user_id).await?;
        let mut outcome = PruneOutcome {
            removed,
            notifications_disabled: false,
        };

        if removed && PushSubscriptionRepo::count_by_user(&self.pool, user_id).await? == 0 {
            outcome.notifications_disabled =
                UserRepo::set_notifications_enabled(&self.pool, user_id, false).await?;
        }

        Ok(outcome)
    }
}
