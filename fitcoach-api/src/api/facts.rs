//! Fact-record creation endpoints
//!
//! Each successful create returns 201 with the stored record. The owner's
//! evaluation has already been updated by then.

use crate::{ApiResult, AppState};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use fitcoach_common::db::{BodyMeasurement, DietPlan, Feedback, ProgressPhoto, Training};
use fitcoach_common::facts::{
    NewBodyMeasurement, NewDietPlan, NewFeedback, NewProgressPhoto, NewTraining,
};

/// POST /api/diet-plans
pub async fn create_diet_plan(
    State(state): State<AppState>,
    Json(payload): Json<NewDietPlan>,
) -> ApiResult<(StatusCode, Json<DietPlan>)> {
    let plan = state.facts.create_diet_plan(payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// POST /api/trainings
pub async fn create_training(
    State(state): State<AppState>,
    Json(payload): Json<NewTraining>,
) -> ApiResult<(StatusCode, Json<Training>)> {
    let training = state.facts.create_training(payload).await?;
    Ok((StatusCode::CREATED, Json(training)))
}

/// POST /api/feedback
pub async fn create_feedback(
    State(state): State<AppState>,
    Json(payload): Json<NewFeedback>,
) -> ApiResult<(StatusCode, Json<Feedback>)> {
    let feedback = state.facts.create_feedback(payload).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// POST /api/progress-photos
pub async fn create_progress_photo(
    State(state): State<AppState>,
    Json(payload): Json<NewProgressPhoto>,
) -> ApiResult<(StatusCode, Json<ProgressPhoto>)> {
    let photo = state.facts.create_progress_photo(payload).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

/// POST /api/body-measurements
///
/// One measurement per user and date; a second one is 409.
pub async fn create_body_measurement(
    State(state): State<AppState>,
    Json(payload): Json<NewBodyMeasurement>,
) -> ApiResult<(StatusCode, Json<BodyMeasurement>)> {
    let measurement = state.facts.create_body_measurement(payload).await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

/// Build fact routes
pub fn fact_routes() -> Router<AppState> {
    Router::new()
        .route("/api/diet-plans", post(create_diet_plan))
        .route("/api/trainings", post(create_training))
        .route("/api/feedback", post(create_feedback))
        .route("/api/progress-photos", post(create_progress_photo))
        .route("/api/body-measurements", post(create_body_measurement))
}
