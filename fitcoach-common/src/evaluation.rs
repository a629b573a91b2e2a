//! Evaluation aggregate: per-relationship completion tracking
//!
//! Each flag moves one way, unset to set, and keeps the timestamp of the
//! first fact that satisfied it. Completion is derived from the flags on read.

use crate::events::FactKind;
use crate::{uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Number of facts a complete evaluation requires
pub const FLAG_COUNT: usize = FactKind::ALL.len();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub relationship_id: Uuid,
    pub has_initial_photos: bool,
    pub initial_photos_date: Option<DateTime<Utc>>,
    pub has_diet_plan: bool,
    pub diet_plan_date: Option<DateTime<Utc>>,
    pub has_training_plan: bool,
    pub training_plan_date: Option<DateTime<Utc>>,
    pub has_progress_log: bool,
    pub progress_log_date: Option<DateTime<Utc>>,
    pub has_body_measurements: bool,
    pub body_measurements_date: Option<DateTime<Utc>>,
    /// Stamped when the last outstanding flag is set
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn flag(&self, kind: FactKind) -> bool {
        match kind {
            FactKind::InitialPhotos => self.has_initial_photos,
            FactKind::DietPlan => self.has_diet_plan,
            FactKind::TrainingPlan => self.has_training_plan,
            FactKind::ProgressLog => self.has_progress_log,
            FactKind::BodyMeasurements => self.has_body_measurements,
        }
    }

    /// When the flag was first satisfied
    pub fn flag_date(&self, kind: FactKind) -> Option<DateTime<Utc>> {
        match kind {
            FactKind::InitialPhotos => self.initial_photos_date,
            FactKind::DietPlan => self.diet_plan_date,
            FactKind::TrainingPlan => self.training_plan_date,
            FactKind::ProgressLog => self.progress_log_date,
            FactKind::BodyMeasurements => self.body_measurements_date,
        }
    }

    pub fn satisfied_count(&self) -> usize {
        FactKind::ALL.iter().filter(|kind| self.flag(**kind)).count()
    }

    /// Percentage of satisfied flags, 0 to 100 in steps of 20
    pub fn completion_percentage(&self) -> f64 {
        self.satisfied_count() as f64 * 100.0 / FLAG_COUNT as f64
    }

    pub fn is_complete(&self) -> bool {
        self.satisfied_count() == FLAG_COUNT
    }

    /// Kinds still missing, in column order
    pub fn missing(&self) -> Vec<FactKind> {
        FactKind::ALL
            .into_iter()
            .filter(|kind| !self.flag(*kind))
            .collect()
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: uuid_utils::column(row, "id")?,
            relationship_id: uuid_utils::column(row, "teacher_student_id")?,
            has_initial_photos: row.try_get("has_initial_photos")?,
            initial_photos_date: row.try_get("initial_photos_date")?,
            has_diet_plan: row.try_get("has_diet_plan")?,
            diet_plan_date: row.try_get("diet_plan_date")?,
            has_training_plan: row.try_get("has_training_plan")?,
            training_plan_date: row.try_get("training_plan_date")?,
            has_progress_log: row.try_get("has_progress_log")?,
            progress_log_date: row.try_get("progress_log_date")?,
            has_body_measurements: row.try_get("has_body_measurements")?,
            body_measurements_date: row.try_get("body_measurements_date")?,
            completed_at: row.try_get("completed_at")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Persistence for evaluation aggregates
#[derive(Clone)]
pub struct EvaluationStore {
    pool: SqlitePool,
}

impl EvaluationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the aggregate for a relationship unless one exists
    ///
    /// Uses the UNIQUE relationship reference so concurrent callers settle on
    /// a single row. Returns true if this call inserted it.
    pub async fn insert_if_absent(
        conn: &mut SqliteConnection,
        relationship_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO student_evaluations (id, teacher_student_id, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(teacher_student_id) DO NOTHING",
        )
        .bind(uuid_utils::generate().to_string())
        .bind(relationship_id.to_string())
        .bind(now)
        .bind(now)
        .execute(conn)
        .await?;

        let created = result.rows_affected() == 1;
        if created {
            debug!("Provisioned evaluation for relationship {}", relationship_id);
        }
        Ok(created)
    }

    /// Fetch the aggregate for a relationship, creating it if absent (idempotent)
    pub async fn get_or_create(&self, relationship_id: Uuid) -> Result<Evaluation> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_if_absent(&mut conn, relationship_id, Utc::now()).await?;

        self.get_for_relationship(relationship_id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "evaluation for relationship {} missing after upsert",
                    relationship_id
                ))
            })
    }

    pub async fn get_for_relationship(&self, relationship_id: Uuid) -> Result<Option<Evaluation>> {
        sqlx::query("SELECT * FROM student_evaluations WHERE teacher_student_id = ?")
            .bind(relationship_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Evaluation::from_row(&row))
            .transpose()
    }

    /// Aggregates for all of a teacher's relationships
    pub async fn list_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Evaluation>> {
        let rows = sqlx::query(
            "SELECT e.* FROM student_evaluations e
             JOIN teacher_students ts ON ts.id = e.teacher_student_id
             WHERE ts.teacher_id = ?
             ORDER BY ts.assigned_at",
        )
        .bind(teacher_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Evaluation::from_row).collect()
    }

    /// Set one flag, keeping the first-satisfied timestamp
    ///
    /// The update is conditional on the flag being unset, so a second fact of
    /// the same kind is a no-op and returns false. When the write sets the
    /// last outstanding flag, `completed_at` is stamped too.
    pub async fn mark_flag(
        &self,
        evaluation: &Evaluation,
        kind: FactKind,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE student_evaluations SET {flag} = 1, {date} = ?, updated_at = ?
             WHERE id = ? AND {flag} = 0",
            flag = kind.flag_column(),
            date = kind.date_column(),
        );
        let result = sqlx::query(&sql)
            .bind(at)
            .bind(at)
            .bind(evaluation.id.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.commit().await?;
            return Ok(false);
        }

        let all_set = FactKind::ALL
            .iter()
            .map(|k| format!("{} = 1", k.flag_column()))
            .collect::<Vec<_>>()
            .join(" AND ");
        let completed = sqlx::query(&format!(
            "UPDATE student_evaluations SET completed_at = ?
             WHERE id = ? AND completed_at IS NULL AND {}",
            all_set
        ))
        .bind(at)
        .bind(evaluation.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if completed.rows_affected() == 1 {
            info!("Evaluation {} is complete", evaluation.id);
        }
        Ok(true)
    }
}
