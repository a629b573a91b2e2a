//! Evaluation synchronization
//!
//! Keeps each relationship's evaluation aggregate in step with the fact records
//! its student accumulates. [`FactStore`](crate::facts::FactStore) calls
//! [`EvaluationSync::apply`] once per created record, right after the insert
//! commits, and the matching flag is marked on the active relationship's
//! aggregate before the create call returns.
//!
//! **Behavior:**
//! - Owner without a student profile → dropped (debug)
//! - Student without an active relationship → dropped (debug), no aggregate created
//! - Flag already set → no-op, first timestamp kept
//! - Errors are returned to the caller, which logs them at warn; the fact
//!   write is unaffected
//!
//! Aggregates that fell behind (a failed sync, records imported directly into
//! the database) are repaired by [`backfill`].

use crate::evaluation::EvaluationStore;
use crate::events::{CoachEvent, EventBus, FactKind, StudentRef};
use crate::relationships::{ActiveRelationshipPolicy, Relationship, RelationshipRegistry};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of applying one fact to the evaluations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Owner could not be resolved to a student profile
    NoStudent,
    /// Student has no active coach
    NoActiveRelationship,
    /// Flag newly set on the aggregate
    FlagSet { evaluation_id: Uuid, completed: bool },
    /// Flag was already set; nothing changed
    AlreadySet,
}

#[derive(Clone)]
pub struct EvaluationSync {
    registry: RelationshipRegistry,
    evaluations: EvaluationStore,
    event_bus: EventBus,
}

impl EvaluationSync {
    pub fn new(
        registry: RelationshipRegistry,
        evaluations: EvaluationStore,
        event_bus: EventBus,
    ) -> Self {
        Self {
            registry,
            evaluations,
            event_bus,
        }
    }

    /// Credit a fact of `kind` owned by `owner` to the owner's active relationship
    pub async fn apply(
        &self,
        kind: FactKind,
        owner: StudentRef,
        at: DateTime<Utc>,
    ) -> Result<SyncOutcome> {
        let Some(student_id) = self.registry.resolve_student(owner).await? else {
            debug!("{} owner {} has no student profile, skipping", kind, owner);
            return Ok(SyncOutcome::NoStudent);
        };

        let Some(relationship) = self.registry.find_active_relationship(student_id).await? else {
            debug!("Student {} has no active relationship, skipping {}", student_id, kind);
            return Ok(SyncOutcome::NoActiveRelationship);
        };

        let evaluation = self.evaluations.get_or_create(relationship.id).await?;
        if !self.evaluations.mark_flag(&evaluation, kind, at).await? {
            debug!("{} already recorded on evaluation {}", kind, evaluation.id);
            return Ok(SyncOutcome::AlreadySet);
        }

        let updated = self
            .evaluations
            .get_for_relationship(relationship.id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!("evaluation {} vanished after update", evaluation.id))
            })?;

        info!(
            "Evaluation {} marked {} ({:.0}% complete)",
            updated.id,
            kind,
            updated.completion_percentage()
        );

        self.event_bus.emit_lossy(CoachEvent::EvaluationUpdated {
            evaluation_id: updated.id,
            relationship_id: relationship.id,
            kind,
            completion_percentage: updated.completion_percentage(),
            complete: updated.is_complete(),
            timestamp: Utc::now(),
        });

        Ok(SyncOutcome::FlagSet {
            evaluation_id: updated.id,
            completed: updated.is_complete(),
        })
    }
}

/// Totals from a backfill run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    /// Relationships examined
    pub relationships: usize,
    /// Aggregates that did not exist before
    pub created: usize,
    /// Aggregates that gained at least one flag
    pub updated: usize,
    /// Total flags set
    pub flags_set: usize,
}

/// Bring every aggregate up to date with the fact records already stored
///
/// Each relationship gets an aggregate. Flags are only credited to the
/// relationship the policy picks for the student, the same one live sync
/// would use; the earliest matching fact supplies the timestamp. Running it
/// twice changes nothing the second time.
pub async fn backfill(
    pool: &SqlitePool,
    policy: ActiveRelationshipPolicy,
) -> Result<BackfillReport> {
    let registry = RelationshipRegistry::new(pool.clone(), policy);
    let evaluations = EvaluationStore::new(pool.clone());
    let mut report = BackfillReport::default();

    for relationship in registry.list_all().await? {
        report.relationships += 1;

        let mut conn = pool.acquire().await?;
        if EvaluationStore::insert_if_absent(&mut conn, relationship.id, Utc::now()).await? {
            report.created += 1;
        }
        drop(conn);

        if !relationship.is_active {
            continue;
        }
        match registry.find_active_relationship(relationship.student_id).await {
            Ok(Some(credited)) if credited.id == relationship.id => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Backfill skipping relationship {}: {}", relationship.id, e);
                continue;
            }
        }

        let flags = backfill_relationship(pool, &registry, &evaluations, &relationship).await?;
        if flags > 0 {
            report.updated += 1;
            report.flags_set += flags;
        }
    }

    info!(
        "Backfill complete: {} relationships, {} aggregates created, {} updated, {} flags set",
        report.relationships, report.created, report.updated, report.flags_set
    );
    Ok(report)
}

async fn backfill_relationship(
    pool: &SqlitePool,
    registry: &RelationshipRegistry,
    evaluations: &EvaluationStore,
    relationship: &Relationship,
) -> Result<usize> {
    let evaluation = evaluations.get_or_create(relationship.id).await?;
    let user_id = registry.student_user_id(relationship.student_id).await?;
    let mut flags = 0;

    for kind in FactKind::ALL {
        if evaluation.flag(kind) {
            continue;
        }
        let owner_id = match kind {
            FactKind::TrainingPlan => relationship.student_id,
            _ => user_id,
        };
        let Some(first) = earliest_fact(pool, kind, owner_id).await? else {
            continue;
        };
        if evaluations.mark_flag(&evaluation, kind, first).await? {
            debug!("Backfill marked {} on evaluation {}", kind, evaluation.id);
            flags += 1;
        }
    }

    Ok(flags)
}

/// Table and owner column holding the facts of each kind
fn fact_source(kind: FactKind) -> (&'static str, &'static str) {
    match kind {
        FactKind::InitialPhotos => ("progress_photos", "user_id"),
        FactKind::DietPlan => ("diet_plans", "student_user_id"),
        FactKind::TrainingPlan => ("trainings", "student_id"),
        FactKind::ProgressLog => ("feedback", "user_id"),
        FactKind::BodyMeasurements => ("body_measurements", "user_id"),
    }
}

async fn earliest_fact(
    pool: &SqlitePool,
    kind: FactKind,
    owner_id: Uuid,
) -> Result<Option<DateTime<Utc>>> {
    let (table, owner_column) = fact_source(kind);
    let rows = sqlx::query(&format!(
        "SELECT created_at FROM {} WHERE {} = ?",
        table, owner_column
    ))
    .bind(owner_id.to_string())
    .fetch_all(pool)
    .await?;

    // Stored timestamps vary in fractional precision; compare parsed values
    let mut earliest: Option<DateTime<Utc>> = None;
    for row in &rows {
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        earliest = Some(earliest.map_or(created_at, |e| e.min(created_at)));
    }
    Ok(earliest)
}
