//! Fact sources: records whose creation counts toward a student's evaluation
//!
//! Once an insert has committed, the create announces
//! `CoachEvent::FactRecorded` on the bus for dashboards and credits the owner's
//! evaluation through [`EvaluationSync`] before returning. A failed sync is
//! logged and never fails the create.

use crate::db::{
    BodyMeasurement, DietGoal, DietPlan, Feedback, PhotoType, ProgressPhoto, Training,
    TrainingGoal,
};
use crate::events::{CoachEvent, EventBus, FactKind, StudentRef};
use crate::sync::EvaluationSync;
use crate::{uuid_utils, Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

/// A record that satisfies one evaluation flag
pub trait FactRecord {
    const KIND: FactKind;

    fn fact_id(&self) -> Uuid;

    fn owner(&self) -> StudentRef;

    fn recorded_at(&self) -> DateTime<Utc>;

    fn fact_event(&self) -> CoachEvent {
        CoachEvent::FactRecorded {
            kind: Self::KIND,
            owner: self.owner(),
            fact_id: self.fact_id(),
            timestamp: self.recorded_at(),
        }
    }
}

impl FactRecord for DietPlan {
    const KIND: FactKind = FactKind::DietPlan;

    fn fact_id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> StudentRef {
        StudentRef::User(self.student_user_id)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl FactRecord for Training {
    const KIND: FactKind = FactKind::TrainingPlan;

    fn fact_id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> StudentRef {
        StudentRef::Student(self.student_id)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl FactRecord for Feedback {
    const KIND: FactKind = FactKind::ProgressLog;

    fn fact_id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> StudentRef {
        StudentRef::User(self.user_id)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl FactRecord for ProgressPhoto {
    const KIND: FactKind = FactKind::InitialPhotos;

    fn fact_id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> StudentRef {
        StudentRef::User(self.user_id)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl FactRecord for BodyMeasurement {
    const KIND: FactKind = FactKind::BodyMeasurements;

    fn fact_id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> StudentRef {
        StudentRef::User(self.user_id)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ========================================
// Inputs
// ========================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewDietPlan {
    pub student_user_id: Uuid,
    pub teacher_user_id: Option<Uuid>,
    pub name: String,
    pub goal: DietGoal,
    pub description: Option<String>,
    pub target_calories: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTraining {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub goal: TrainingGoal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub user_id: Uuid,
    pub receiver_teacher_id: Uuid,
    #[serde(default)]
    pub rating: u32,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProgressPhoto {
    pub user_id: Uuid,
    pub photo_type: PhotoType,
    pub image_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBodyMeasurement {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub muscle_mass_kg: Option<f64>,
    pub neck_cm: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub notes: Option<String>,
}

const MAX_RATING: u32 = 5;

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::InvalidInput(format!(
            "{} must be a non-negative number",
            field
        ))),
        _ => Ok(()),
    }
}

/// Translate constraint failures on insert into domain errors
fn insert_error(e: sqlx::Error, what: &str) -> Error {
    let err = Error::from(e);
    if err.is_foreign_key_violation() {
        Error::NotFound(format!("{} references an unknown record", what))
    } else if err.is_unique_violation() {
        Error::Conflict(format!("{} already exists", what))
    } else {
        err
    }
}

/// Creates fact records and credits them to evaluations
#[derive(Clone)]
pub struct FactStore {
    pool: SqlitePool,
    event_bus: EventBus,
    sync: EvaluationSync,
}

impl FactStore {
    pub fn new(pool: SqlitePool, event_bus: EventBus, sync: EvaluationSync) -> Self {
        Self {
            pool,
            event_bus,
            sync,
        }
    }

    /// Post-commit hook shared by every create
    async fn announce<F: FactRecord>(&self, record: &F) {
        debug!("Fact recorded: {} {}", F::KIND, record.fact_id());
        self.event_bus.emit_lossy(record.fact_event());

        match self
            .sync
            .apply(F::KIND, record.owner(), record.recorded_at())
            .await
        {
            Ok(outcome) => debug!("Evaluation sync for {}: {:?}", record.fact_id(), outcome),
            Err(e) => warn!(
                "Evaluation sync failed for {} {}: {}",
                F::KIND,
                record.fact_id(),
                e
            ),
        }
    }

    pub async fn create_diet_plan(&self, input: NewDietPlan) -> Result<DietPlan> {
        require_text("name", &input.name)?;
        if input.end_date < input.start_date {
            return Err(Error::InvalidInput(
                "end_date must not be before start_date".to_string(),
            ));
        }
        if matches!(input.target_calories, Some(c) if c < 0) {
            return Err(Error::InvalidInput(
                "target_calories must not be negative".to_string(),
            ));
        }

        let plan = DietPlan {
            id: uuid_utils::generate(),
            student_user_id: input.student_user_id,
            teacher_user_id: input.teacher_user_id,
            name: input.name,
            goal: input.goal,
            description: input.description,
            target_calories: input.target_calories,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO diet_plans (id, student_user_id, teacher_user_id, name, goal, description,
                                     target_calories, start_date, end_date, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(plan.id.to_string())
        .bind(plan.student_user_id.to_string())
        .bind(plan.teacher_user_id.map(|id| id.to_string()))
        .bind(&plan.name)
        .bind(plan.goal.code())
        .bind(&plan.description)
        .bind(plan.target_calories)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "diet plan"))?;

        self.announce(&plan).await;
        Ok(plan)
    }

    pub async fn create_training(&self, input: NewTraining) -> Result<Training> {
        require_text("name", &input.name)?;

        let training = Training {
            id: uuid_utils::generate(),
            student_id: input.student_id,
            teacher_id: input.teacher_id,
            name: input.name,
            goal: input.goal,
            description: input.description,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO trainings (id, student_id, teacher_id, name, goal, description, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(training.id.to_string())
        .bind(training.student_id.to_string())
        .bind(training.teacher_id.to_string())
        .bind(&training.name)
        .bind(training.goal.code())
        .bind(&training.description)
        .bind(training.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "training"))?;

        self.announce(&training).await;
        Ok(training)
    }

    pub async fn create_feedback(&self, input: NewFeedback) -> Result<Feedback> {
        require_text("message", &input.message)?;
        if input.rating > MAX_RATING {
            return Err(Error::InvalidInput(format!(
                "rating must be between 0 and {}",
                MAX_RATING
            )));
        }

        let feedback = Feedback {
            id: uuid_utils::generate(),
            user_id: input.user_id,
            receiver_teacher_id: input.receiver_teacher_id,
            rating: input.rating,
            message: input.message,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO feedback (id, user_id, receiver_teacher_id, rating, message, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(feedback.id.to_string())
        .bind(feedback.user_id.to_string())
        .bind(feedback.receiver_teacher_id.to_string())
        .bind(feedback.rating)
        .bind(&feedback.message)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "feedback"))?;

        self.announce(&feedback).await;
        Ok(feedback)
    }

    pub async fn create_progress_photo(&self, input: NewProgressPhoto) -> Result<ProgressPhoto> {
        require_text("image_path", &input.image_path)?;

        let photo = ProgressPhoto {
            id: uuid_utils::generate(),
            user_id: input.user_id,
            photo_type: input.photo_type,
            image_path: input.image_path,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO progress_photos (id, user_id, photo_type, image_path, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(photo.id.to_string())
        .bind(photo.user_id.to_string())
        .bind(photo.photo_type.code())
        .bind(&photo.image_path)
        .bind(photo.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "progress photo"))?;

        self.announce(&photo).await;
        Ok(photo)
    }

    pub async fn create_body_measurement(
        &self,
        input: NewBodyMeasurement,
    ) -> Result<BodyMeasurement> {
        require_non_negative("weight_kg", input.weight_kg)?;
        require_non_negative("muscle_mass_kg", input.muscle_mass_kg)?;
        require_non_negative("neck_cm", input.neck_cm)?;
        require_non_negative("chest_cm", input.chest_cm)?;
        require_non_negative("waist_cm", input.waist_cm)?;
        require_non_negative("hips_cm", input.hips_cm)?;
        if matches!(input.body_fat_percent, Some(p) if !(0.0..=100.0).contains(&p)) {
            return Err(Error::InvalidInput(
                "body_fat_percent must be between 0 and 100".to_string(),
            ));
        }

        let measurement = BodyMeasurement {
            id: uuid_utils::generate(),
            user_id: input.user_id,
            date: input.date,
            weight_kg: input.weight_kg,
            body_fat_percent: input.body_fat_percent,
            muscle_mass_kg: input.muscle_mass_kg,
            neck_cm: input.neck_cm,
            chest_cm: input.chest_cm,
            waist_cm: input.waist_cm,
            hips_cm: input.hips_cm,
            notes: input.notes,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO body_measurements (id, user_id, date, weight_kg, body_fat_percent,
                                            muscle_mass_kg, neck_cm, chest_cm, waist_cm, hips_cm,
                                            notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(measurement.id.to_string())
        .bind(measurement.user_id.to_string())
        .bind(measurement.date)
        .bind(measurement.weight_kg)
        .bind(measurement.body_fat_percent)
        .bind(measurement.muscle_mass_kg)
        .bind(measurement.neck_cm)
        .bind(measurement.chest_cm)
        .bind(measurement.waist_cm)
        .bind(measurement.hips_cm)
        .bind(&measurement.notes)
        .bind(measurement.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "body measurement"))?;

        self.announce(&measurement).await;
        Ok(measurement)
    }
}
