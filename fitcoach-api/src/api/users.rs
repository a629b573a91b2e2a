//! User account endpoints

use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitcoach_common::accounts::NewAccount;
use fitcoach_common::db::Account;
use uuid::Uuid;

/// POST /api/users
///
/// **Request:** `{"username", "email", "student": {"age", "weight_kg", "height_cm"}?, "teacher": {"bio"?, "specialties"?}?}`
///
/// **Errors:**
/// - 400 Bad Request: empty username, malformed email, non-positive body metrics
/// - 409 Conflict: username or email already taken
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = state.accounts.create(payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    state
        .accounts
        .get(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))
}

/// Build user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user))
}
