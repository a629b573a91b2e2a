//! Fact kinds and ownership references carried by fact events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The five kinds of record that count toward a student's evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    /// Progress photo uploaded
    InitialPhotos,
    /// Diet plan assigned
    DietPlan,
    /// Training plan assigned
    TrainingPlan,
    /// Feedback / progress log entry written
    ProgressLog,
    /// Body measurement recorded
    BodyMeasurements,
}

impl FactKind {
    /// Every kind, in aggregate column order
    pub const ALL: [FactKind; 5] = [
        FactKind::InitialPhotos,
        FactKind::DietPlan,
        FactKind::TrainingPlan,
        FactKind::ProgressLog,
        FactKind::BodyMeasurements,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FactKind::InitialPhotos => "initial_photos",
            FactKind::DietPlan => "diet_plan",
            FactKind::TrainingPlan => "training_plan",
            FactKind::ProgressLog => "progress_log",
            FactKind::BodyMeasurements => "body_measurements",
        }
    }

    /// Boolean column in `student_evaluations`
    pub fn flag_column(self) -> &'static str {
        match self {
            FactKind::InitialPhotos => "has_initial_photos",
            FactKind::DietPlan => "has_diet_plan",
            FactKind::TrainingPlan => "has_training_plan",
            FactKind::ProgressLog => "has_progress_log",
            FactKind::BodyMeasurements => "has_body_measurements",
        }
    }

    /// First-satisfied timestamp column in `student_evaluations`
    pub fn date_column(self) -> &'static str {
        match self {
            FactKind::InitialPhotos => "initial_photos_date",
            FactKind::DietPlan => "diet_plan_date",
            FactKind::TrainingPlan => "training_plan_date",
            FactKind::ProgressLog => "progress_log_date",
            FactKind::BodyMeasurements => "body_measurements_date",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown fact kind: {}", s))
    }
}

/// How a fact record names the student it belongs to
///
/// Training plans point at the student profile directly; every other fact
/// kind points at the student's user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "id", rename_all = "snake_case")]
pub enum StudentRef {
    Student(Uuid),
    User(Uuid),
}

impl fmt::Display for StudentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentRef::Student(id) => write!(f, "student {}", id),
            StudentRef::User(id) => write!(f, "user {}", id),
        }
    }
}
