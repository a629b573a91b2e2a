//! Workout tracking: exercises, sessions with exercise and set logs, and
//! personal-record lookup

use crate::db::{Exercise, ExerciseLog, SessionStatus, SetLog, SetType, WorkoutSession};
use crate::strength::{select_personal_record, PersonalRecord, WorkSet};
use crate::{uuid_utils, Error, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewExercise {
    pub name: String,
    pub muscle_group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSetLog {
    #[serde(default = "default_set_type")]
    pub set_type: SetType,
    pub repetitions: u32,
    pub weight_kg: f64,
}

fn default_set_type() -> SetType {
    SetType::Working
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExerciseLog {
    pub exercise_id: Uuid,
    pub notes: Option<String>,
    #[serde(default)]
    pub sets: Vec<NewSetLog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkoutSession {
    pub user_id: Uuid,
    pub date: NaiveDate,
    #[serde(default = "default_status")]
    pub status: SessionStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<NewExerciseLog>,
}

fn default_status() -> SessionStatus {
    SessionStatus::Planned
}

#[derive(Clone)]
pub struct TrackingStore {
    pool: SqlitePool,
}

impl TrackingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_exercise(&self, input: NewExercise) -> Result<Exercise> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("exercise name must not be empty".to_string()));
        }

        let exercise = Exercise {
            id: uuid_utils::generate(),
            name,
            muscle_group: input.muscle_group,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO exercises (id, name, muscle_group, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(exercise.id.to_string())
        .bind(&exercise.name)
        .bind(&exercise.muscle_group)
        .bind(exercise.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(exercise),
            Err(e) => {
                let err = Error::from(e);
                if err.is_unique_violation() {
                    Err(Error::Conflict(format!("exercise '{}' already exists", exercise.name)))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Record a session with its exercise and set logs in one transaction
    ///
    /// Exercise logs are numbered in the order given; set numbers restart at 1
    /// for each exercise.
    pub async fn record_session(&self, input: NewWorkoutSession) -> Result<WorkoutSession> {
        for exercise in &input.exercises {
            for set in &exercise.sets {
                if !set.weight_kg.is_finite() || set.weight_kg < 0.0 {
                    return Err(Error::InvalidInput(format!(
                        "set weight must be a non-negative number, got {}",
                        set.weight_kg
                    )));
                }
            }
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let session_id = uuid_utils::generate();
        sqlx::query(
            "INSERT INTO workout_sessions (id, user_id, date, status, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id.to_string())
        .bind(input.user_id.to_string())
        .bind(input.date)
        .bind(input.status.code())
        .bind(&input.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| reference_error(e, "workout session"))?;

        let mut exercises = Vec::with_capacity(input.exercises.len());
        for (index, exercise) in input.exercises.into_iter().enumerate() {
            let log_id = uuid_utils::generate();
            let position = index as u32 + 1;
            sqlx::query(
                "INSERT INTO exercise_logs (id, session_id, exercise_id, position, notes, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(log_id.to_string())
            .bind(session_id.to_string())
            .bind(exercise.exercise_id.to_string())
            .bind(position)
            .bind(&exercise.notes)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| reference_error(e, "exercise log"))?;

            let mut sets = Vec::with_capacity(exercise.sets.len());
            for (set_index, set) in exercise.sets.into_iter().enumerate() {
                let set_log = SetLog {
                    id: uuid_utils::generate(),
                    set_type: set.set_type,
                    set_number: set_index as u32 + 1,
                    repetitions: set.repetitions,
                    weight_kg: set.weight_kg,
                    created_at: now,
                };
                sqlx::query(
                    "INSERT INTO set_logs (id, exercise_log_id, set_type, set_number, repetitions, weight_kg, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(set_log.id.to_string())
                .bind(log_id.to_string())
                .bind(set_log.set_type.code())
                .bind(set_log.set_number)
                .bind(set_log.repetitions)
                .bind(set_log.weight_kg)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                sets.push(set_log);
            }

            exercises.push(ExerciseLog {
                id: log_id,
                exercise_id: exercise.exercise_id,
                position,
                notes: exercise.notes,
                sets,
            });
        }

        tx.commit().await?;
        info!(
            "Recorded workout session {} for user {} ({} exercises)",
            session_id,
            input.user_id,
            exercises.len()
        );

        Ok(WorkoutSession {
            id: session_id,
            user_id: input.user_id,
            date: input.date,
            status: input.status,
            notes: input.notes,
            exercises,
            created_at: now,
        })
    }

    /// All working sets a user logged for an exercise
    pub async fn work_sets(&self, user_id: Uuid, exercise_id: Uuid) -> Result<Vec<WorkSet>> {
        let rows = sqlx::query(
            "SELECT sl.id, sl.weight_kg, sl.repetitions, sl.created_at, ws.date
             FROM set_logs sl
             JOIN exercise_logs el ON el.id = sl.exercise_log_id
             JOIN workout_sessions ws ON ws.id = el.session_id
             WHERE ws.user_id = ? AND el.exercise_id = ? AND sl.set_type = ?",
        )
        .bind(user_id.to_string())
        .bind(exercise_id.to_string())
        .bind(SetType::Working.code())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(work_set_from_row).collect()
    }

    /// Heaviest working set for a user and exercise, if any
    pub async fn find_personal_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
    ) -> Result<Option<PersonalRecord>> {
        let sets = self.work_sets(user_id, exercise_id).await?;
        Ok(select_personal_record(&sets)
            .map(|set| PersonalRecord::from_set(user_id, exercise_id, set)))
    }
}

fn work_set_from_row(row: &SqliteRow) -> Result<WorkSet> {
    Ok(WorkSet {
        set_log_id: uuid_utils::column(row, "id")?,
        weight_kg: row.try_get("weight_kg")?,
        repetitions: row.try_get("repetitions")?,
        performed_on: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
    })
}

fn reference_error(e: sqlx::Error, what: &str) -> Error {
    let err = Error::from(e);
    if err.is_foreign_key_violation() {
        Error::NotFound(format!("{} references an unknown user or exercise", what))
    } else {
        err
    }
}
