//! One-rep-max estimation endpoint

use crate::{ApiResult, AppState};
use axum::{extract::Query, routing::get, Json, Router};
use fitcoach_common::strength::estimate_one_rep_max;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct OneRepMaxQuery {
    pub weight: f64,
    pub reps: u32,
}

#[derive(Debug, Serialize)]
pub struct OneRepMaxResponse {
    pub weight_kg: f64,
    pub reps: u32,
    pub estimated_one_rep_max: f64,
}

/// GET /api/strength/one-rep-max?weight=&reps=
///
/// 400 for zero reps or a negative weight.
pub async fn one_rep_max(Query(query): Query<OneRepMaxQuery>) -> ApiResult<Json<OneRepMaxResponse>> {
    let estimate = estimate_one_rep_max(query.weight, query.reps)?;
    Ok(Json(OneRepMaxResponse {
        weight_kg: query.weight,
        reps: query.reps,
        estimated_one_rep_max: estimate,
    }))
}

/// Build strength routes
pub fn strength_routes() -> Router<AppState> {
    Router::new().route("/api/strength/one-rep-max", get(one_rep_max))
}
