//! Route definitions for the `/timetable` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::timetable;
use crate::state::AppState;

/// Routes mounted at `/timetable`.
///
/// ```text
/// POST   /validate   -> validate   (?allowOverlaps)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(timetable::validate))
}
