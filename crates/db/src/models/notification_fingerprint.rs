//! Notification fingerprint history model.

use serde::Serialize;
use sqlx::FromRow;
use vplan_core::types::{DateNumber, DbId, Timestamp};

/// A row from the `notification_fingerprints` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationFingerprint {
    pub id: DbId,
    pub user_id: DbId,
    /// `YYYYMMDD`.
    pub target_date: DateNumber,
    /// 64-char SHA-256 hex digest of the notified change-set.
    pub fingerprint: String,
    pub match_count: i32,
    pub sent_at: Timestamp,
}

/// DTO for recording a notified change-set.
#[derive(Debug, Clone)]
pub struct RecordFingerprint {
    pub user_id: DbId,
    pub target_date: DateNumber,
    pub fingerprint: String,
    pub match_count: i32,
}
