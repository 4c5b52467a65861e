pub mod health;
pub mod internal;
pub mod push;
pub mod timetable;
pub mod users;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /push/vapid-public-key                           VAPID public key (GET)
///
/// /timetable/validate                              validate entries (POST, ?allowOverlaps)
///
/// /users                                           create (POST)
/// /users/{id}                                      get (GET)
/// /users/{id}/timetable                            replace timetable (PUT, ?allowOverlaps)
/// /users/{id}/push-subscriptions                   register browser subscription (POST)
///
/// /internal/push/dispatch                          signed dispatch trigger (POST, GET)
/// ```
///
/// `cors` wraps every route except `/internal`.
pub fn api_routes(cors: CorsLayer) -> Router<AppState> {
    Router::new()
        .nest("/push", push::router())
        .nest("/timetable", timetable::router())
        .nest("/users", users::router())
        .layer(cors)
        .nest("/internal", internal::router())
}
