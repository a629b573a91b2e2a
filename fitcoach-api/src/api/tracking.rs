//! Exercise, workout session and personal-record endpoints

use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitcoach_common::db::{Exercise, WorkoutSession};
use fitcoach_common::strength::PersonalRecord;
use fitcoach_common::tracking::{NewExercise, NewWorkoutSession};
use uuid::Uuid;

/// POST /api/exercises
pub async fn create_exercise(
    State(state): State<AppState>,
    Json(payload): Json<NewExercise>,
) -> ApiResult<(StatusCode, Json<Exercise>)> {
    let exercise = state.tracking.create_exercise(payload).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

/// POST /api/workout-sessions
///
/// **Request:** session with nested `exercises[].sets[]`; set numbers and
/// exercise positions are assigned in request order.
pub async fn create_workout_session(
    State(state): State<AppState>,
    Json(payload): Json<NewWorkoutSession>,
) -> ApiResult<(StatusCode, Json<WorkoutSession>)> {
    let session = state.tracking.record_session(payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/users/:id/personal-records/:exercise_id
///
/// 404 when the user has no working sets for the exercise.
pub async fn get_personal_record(
    State(state): State<AppState>,
    Path((user_id, exercise_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PersonalRecord>> {
    state
        .tracking
        .find_personal_record(user_id, exercise_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no working sets for user {} and exercise {}",
                user_id, exercise_id
            ))
        })
}

/// Build tracking routes
pub fn tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/exercises", post(create_exercise))
        .route("/api/workout-sessions", post(create_workout_session))
        .route(
            "/api/users/:id/personal-records/:exercise_id",
            get(get_personal_record),
        )
}
