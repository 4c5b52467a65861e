//! Push subscription entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vplan_core::types::{DbId, Timestamp};

/// Host used by Apple's web push service; identifies iOS/macOS Safari devices.
pub const APPLE_PUSH_HOST: &str = "web.push.apple.com";

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: DbId,
    pub user_agent: Option<String>,
    pub last_seen_at: Timestamp,
    pub created_at: Timestamp,
}

impl PushSubscription {
    /// Whether the endpoint belongs to Apple's push service.
    pub fn is_apple_endpoint(&self) -> bool {
        self.endpoint.contains(APPLE_PUSH_HOST)
    }
}

/// DTO for registering (or refreshing) a browser subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertPushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}
