//! Route definitions for the `/users` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{push, timetable, users};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// PUT    /{id}/timetable            -> timetable::replace   (?allowOverlaps)
/// POST   /{id}/push-subscriptions   -> push::subscribe
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(users::create))
        .route("/{id}", get(users::get_by_id))
        .route("/{id}/timetable", put(timetable::replace))
        .route("/{id}/push-subscriptions", post(push::subscribe))
}
