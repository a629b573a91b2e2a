//! Evaluation queries for teacher dashboards
//!
//! Aggregates are read-only over HTTP; only the sync service sets flags.

use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use fitcoach_common::evaluation::Evaluation;
use fitcoach_common::events::FactKind;
use serde::Serialize;
use uuid::Uuid;

/// Aggregate plus the values derived from its flags
#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub completion_percentage: f64,
    pub complete: bool,
    pub missing: Vec<FactKind>,
}

impl From<Evaluation> for EvaluationResponse {
    fn from(evaluation: Evaluation) -> Self {
        Self {
            completion_percentage: evaluation.completion_percentage(),
            complete: evaluation.is_complete(),
            missing: evaluation.missing(),
            evaluation,
        }
    }
}

/// GET /api/relationships/:id/evaluation
///
/// 404 when the relationship is unknown or has no aggregate yet (run backfill).
pub async fn get_relationship_evaluation(
    State(state): State<AppState>,
    Path(relationship_id): Path<Uuid>,
) -> ApiResult<Json<EvaluationResponse>> {
    let evaluation = state
        .evaluations
        .get_for_relationship(relationship_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("evaluation for relationship {}", relationship_id))
        })?;
    Ok(Json(evaluation.into()))
}

/// GET /api/teachers/:id/evaluations
pub async fn list_teacher_evaluations(
    State(state): State<AppState>,
    Path(teacher_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EvaluationResponse>>> {
    let evaluations = state.evaluations.list_for_teacher(teacher_id).await?;
    Ok(Json(evaluations.into_iter().map(Into::into).collect()))
}

/// Build evaluation routes
pub fn evaluation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/relationships/:id/evaluation",
            get(get_relationship_evaluation),
        )
        .route("/api/teachers/:id/evaluations", get(list_teacher_evaluations))
}
