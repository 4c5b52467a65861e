//! Route definitions for browser push setup.

use axum::routing::get;
use axum::Router;

use crate::handlers::push;
use crate::state::AppState;

/// Routes mounted at `/push`.
///
/// ```text
/// GET    /vapid-public-key   -> vapid_public_key
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/vapid-public-key", get(push::vapid_public_key))
}
