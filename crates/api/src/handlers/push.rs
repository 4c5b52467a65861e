//! Handlers for browser push setup.

use axum::extract::{Path, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use vplan_core::error::CoreError;
use vplan_core::types::DbId;
use vplan_db::models::push_subscription::UpsertPushSubscription;
use vplan_db::repositories::PushSubscriptionRepo;

use crate::error::AppResult;
use crate::handlers::users::require_user;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VapidPublicKey {
    pub vapid_public_key: String,
}

/// GET /api/v1/push/vapid-public-key
///
/// The `applicationServerKey` browsers subscribe with. 503 when push is not
/// configured.
pub async fn vapid_public_key(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<VapidPublicKey>>> {
    let key = state
        .vapid_public_key
        .as_deref()
        .ok_or_else(|| CoreError::Configuration("Web Push is not configured".into()))?;

    Ok(Json(DataResponse {
        data: VapidPublicKey {
            vapid_public_key: key.to_string(),
        },
    }))
}

/// Key material of a browser subscription (`PushSubscription.toJSON().keys`).
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

/// Body of a subscribe request, shaped like `PushSubscription.toJSON()`.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionInput {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

impl SubscriptionInput {
    /// Trim every field; all three must be present and non-empty.
    pub fn into_upsert(
        self,
        user_agent: Option<String>,
    ) -> Result<UpsertPushSubscription, CoreError> {
        let required = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match (
            required(self.endpoint),
            required(self.keys.p256dh),
            required(self.keys.auth),
        ) {
            (Some(endpoint), Some(p256dh), Some(auth)) => Ok(UpsertPushSubscription {
                endpoint,
                p256dh,
                auth,
                user_agent,
            }),
            _ => Err(CoreError::Validation(
                "Push subscription needs an endpoint and both keys".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSaved {
    pub id: DbId,
    pub endpoint: String,
}

/// POST /api/v1/users/{id}/push-subscriptions
///
/// Registers the browser subscription for the user, or moves a known endpoint
/// to this user with fresh keys. 400 when the endpoint or a key is missing.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    headers: HeaderMap,
    Json(input): Json<SubscriptionInput>,
) -> AppResult<Json<DataResponse<SubscriptionSaved>>> {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upsert = input.into_upsert(user_agent)?;
    require_user(&state, user_id).await?;

    let saved = PushSubscriptionRepo::upsert(&state.pool, user_id, &upsert).await?;
    tracing::info!(
        user_id,
        subscription_id = saved.id,
        apple = saved.is_apple_endpoint(),
        "Push subscription saved",
    );

    Ok(Json(DataResponse {
        data: SubscriptionSaved {
            id: saved.id,
            endpoint: saved.endpoint,
        },
    }))
}
