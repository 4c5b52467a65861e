//! User entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vplan_core::calendar::clamp_lookahead;
use vplan_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub notifications_enabled: bool,
    pub notification_lookahead_school_days: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Lookahead in school days, clamped to the supported range.
    pub fn lookahead_school_days(&self) -> i16 {
        clamp_lookahead(self.notification_lookahead_school_days)
    }
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    #[serde(default)]
    pub notifications_enabled: bool,
    pub notification_lookahead_school_days: Option<i16>,
}
