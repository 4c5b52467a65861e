//! Handlers for timetable validation and storage.
//!
//! Submitted entries are always normalized and checked for double-booked
//! periods before anything touches the database.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use vplan_core::error::CoreError;
use vplan_core::timetable::{
    find_conflicts, validate_entries, TimetableConflict, TimetableEntry, TimetableEntryInput,
    ValidationOptions,
};
use vplan_core::types::DbId;
use vplan_db::repositories::TimetableEntryRepo;

use crate::config::is_truthy;
use crate::error::AppResult;
use crate::handlers::users::require_user;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateParams {
    pub allow_overlaps: Option<String>,
}

impl ValidateParams {
    fn options(&self) -> ValidationOptions {
        ValidationOptions {
            allow_overlaps: self.allow_overlaps.as_deref().is_some_and(is_truthy),
        }
    }
}

/// A normalized timetable and the overlaps it still contains.
#[derive(Debug, Serialize)]
pub struct ValidatedTimetable {
    pub entries: Vec<TimetableEntry>,
    /// Empty unless overlaps were allowed.
    pub conflicts: Vec<TimetableConflict>,
}

/// POST /api/v1/timetable/validate?allowOverlaps=
///
/// 400 for a malformed entry, 409 listing every conflicting pair unless
/// `allowOverlaps` is set.
pub async fn validate(
    Query(params): Query<ValidateParams>,
    Json(inputs): Json<Vec<TimetableEntryInput>>,
) -> AppResult<Json<DataResponse<ValidatedTimetable>>> {
    let entries = validate_entries(&inputs, params.options())?;
    let conflicts = find_conflicts(&entries);

    Ok(Json(DataResponse {
        data: ValidatedTimetable { entries, conflicts },
    }))
}

/// PUT /api/v1/users/{id}/timetable?allowOverlaps=
///
/// Replaces the user's whole timetable. Validation errors answer exactly as
/// [`validate`] does and leave the stored timetable untouched; 404 for an
/// unknown user.
pub async fn replace(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<ValidateParams>,
    Json(inputs): Json<Vec<TimetableEntryInput>>,
) -> AppResult<Json<DataResponse<ValidatedTimetable>>> {
    let validated = validate_entries(&inputs, params.options())?;
    require_user(&state, user_id).await?;

    let rows = TimetableEntryRepo::replace_for_user(&state.pool, user_id, &validated).await?;
    let entries = rows
        .iter()
        .map(|row| {
            row.to_entry().map_err(|reason| {
                CoreError::Internal(format!("stored timetable entry {}: {reason}", row.id))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let conflicts = find_conflicts(&entries);

    tracing::info!(user_id, entries = entries.len(), "Timetable replaced");
    Ok(Json(DataResponse {
        data: ValidatedTimetable { entries, conflicts },
    }))
}
