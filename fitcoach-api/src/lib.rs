//! fitcoach-api library - HTTP service for the FitCoach backend
//!
//! Exposes account, relationship, fact-record and workout endpoints. Fact
//! creation updates the matching evaluation before the response is sent.

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use fitcoach_common::accounts::AccountStore;
use fitcoach_common::evaluation::EvaluationStore;
use fitcoach_common::events::EventBus;
use fitcoach_common::facts::FactStore;
use fitcoach_common::relationships::{ActiveRelationshipPolicy, RelationshipRegistry};
use fitcoach_common::sync::EvaluationSync;
use fitcoach_common::tracking::TrackingStore;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub accounts: AccountStore,
    pub registry: RelationshipRegistry,
    pub evaluations: EvaluationStore,
    pub facts: FactStore,
    pub tracking: TrackingStore,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, policy: ActiveRelationshipPolicy) -> Self {
        let registry = RelationshipRegistry::new(db.clone(), policy);
        let evaluations = EvaluationStore::new(db.clone());
        let sync = EvaluationSync::new(registry.clone(), evaluations.clone(), event_bus.clone());

        Self {
            accounts: AccountStore::new(db.clone()),
            facts: FactStore::new(db.clone(), event_bus.clone(), sync),
            tracking: TrackingStore::new(db.clone()),
            startup_time: Utc::now(),
            registry,
            evaluations,
            event_bus,
            db,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::user_routes())
        .merge(api::relationship_routes())
        .merge(api::evaluation_routes())
        .merge(api::fact_routes())
        .merge(api::tracking_routes())
        .merge(api::strength_routes())
        .merge(api::sse_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
