//! Handler for the signed dispatch trigger.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use vplan_core::types::DbId;

use crate::config::is_truthy;
use crate::engine::{local_now, DeviceFilter, DispatchError, DispatchOptions, DispatchRun};
use crate::error::{AppError, AppResult};
use crate::middleware::signature::SignedTrigger;
use crate::state::AppState;

/// Query parameters accepted by the trigger.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchParams {
    pub force: Option<String>,
    pub send_unchanged: Option<String>,
    pub user_id: Option<String>,
    pub device: Option<String>,
}

impl DispatchParams {
    pub fn options(&self) -> AppResult<DispatchOptions> {
        let flag = |value: &Option<String>| value.as_deref().is_some_and(is_truthy);

        let only_user = match self.user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<DbId>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid userId: {raw}")))?,
            ),
        };

        Ok(DispatchOptions {
            force: flag(&self.force),
            send_unchanged: flag(&self.send_unchanged),
            only_user,
            device: DeviceFilter::parse(self.device.as_deref()),
        })
    }
}

/// POST|GET /api/v1/internal/push/dispatch
///
/// Runs one dispatch pass. Rejected with 401 before any processing when the
/// signature is missing or invalid. Answers 503 when substitution data could
/// not be loaded.
pub async fn dispatch(
    State(state): State<AppState>,
    Query(params): Query<DispatchParams>,
    trigger: SignedTrigger,
) -> AppResult<Response> {
    let options = params.options()?;
    tracing::info!(
        url = %trigger.url,
        force = options.force,
        send_unchanged = options.send_unchanged,
        "Dispatch trigger accepted",
    );

    let now = local_now(state.config.timezone);
    match state.engine.run(now, &options).await {
        Ok(DispatchRun::OutsideWindow) => {
            Ok(Json(json!({ "ok": true, "skipped": "outside-window" })).into_response())
        }
        Ok(DispatchRun::Completed(summary)) => Ok(Json(summary).into_response()),
        Err(DispatchError::UpstreamUnavailable { .. }) => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ok": false,
                "forced": options.force,
                "includePayload": state.engine.config().include_payload,
                "error": "upstream-unavailable",
            })),
        )
            .into_response()),
        Err(DispatchError::Store(e)) => Err(e.into()),
    }
}
