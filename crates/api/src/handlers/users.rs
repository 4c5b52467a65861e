//! Handlers for the `/users` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use vplan_core::error::CoreError;
use vplan_core::types::DbId;
use vplan_db::models::user::{CreateUser, User};
use vplan_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/users
///
/// 400 for a blank or malformed email, 409 when the email is already taken.
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    input.email = input.email.trim().to_lowercase();
    if input.email.is_empty() || !input.email.contains('@') {
        return Err(CoreError::Validation("A valid email address is required".into()).into());
    }

    let user = UserRepo::create(&state.pool, &input).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = require_user(&state, id).await?;
    Ok(Json(DataResponse { data: user }))
}

/// Load a user or fail with 404.
pub(crate) async fn require_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}
