//! Teacher-student relationship endpoints

use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use fitcoach_common::events::CoachEvent;
use fitcoach_common::relationships::Relationship;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    /// Defaults to now
    pub assigned_at: Option<DateTime<Utc>>,
}

/// POST /api/relationships
///
/// Returns 201 for a new pairing, 200 when an existing one is re-activated.
pub async fn assign_relationship(
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> ApiResult<(StatusCode, Json<Relationship>)> {
    let (relationship, created) = state
        .registry
        .assign(
            payload.teacher_id,
            payload.student_id,
            payload.assigned_at.unwrap_or_else(Utc::now),
        )
        .await?;

    state.event_bus.emit_lossy(CoachEvent::RelationshipAssigned {
        relationship_id: relationship.id,
        teacher_id: relationship.teacher_id,
        student_id: relationship.student_id,
        timestamp: Utc::now(),
    });

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(relationship)))
}

/// POST /api/relationships/:id/deactivate
pub async fn deactivate_relationship(
    State(state): State<AppState>,
    Path(relationship_id): Path<Uuid>,
) -> ApiResult<Json<Relationship>> {
    let relationship = state.registry.deactivate(relationship_id).await?;

    state.event_bus.emit_lossy(CoachEvent::RelationshipDeactivated {
        relationship_id,
        timestamp: Utc::now(),
    });

    Ok(Json(relationship))
}

/// Build relationship routes
pub fn relationship_routes() -> Router<AppState> {
    Router::new()
        .route("/api/relationships", post(assign_relationship))
        .route(
            "/api/relationships/:id/deactivate",
            post(deactivate_relationship),
        )
}
