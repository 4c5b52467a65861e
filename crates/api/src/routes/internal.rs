//! Route definitions for scheduler-facing endpoints.

use axum::routing::post;
use axum::Router;

use crate::handlers::dispatch;
use crate::state::AppState;

/// Routes mounted at `/internal`. Every route requires a signed trigger.
///
/// ```text
/// POST   /push/dispatch   -> dispatch   (?force, ?sendUnchanged, ?userId, ?device)
/// GET    /push/dispatch   -> dispatch
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/push/dispatch",
        post(dispatch::dispatch).get(dispatch::dispatch),
    )
}
