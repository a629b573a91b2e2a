//! Database models
//!
//! Plain data records returned by the stores. Coded enums are stored as the
//! short code strings shown in their serde renames.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Coded enums
// ========================================

macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            /// Code stored in the database
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }
    };
}

coded_enum!(
    /// Diet plan goal
    DietGoal {
        Bulking => "BUK",
        Cutting => "CUT",
        Maintenance => "MAINT",
    }
);

coded_enum!(
    /// Training plan goal
    TrainingGoal {
        Strength => "STR",
        Hypertrophy => "HYP",
        Endurance => "END",
        WeightLoss => "WL",
        GeneralFitness => "GEN",
    }
);

coded_enum!(
    /// Angle of a progress photo
    PhotoType {
        Front => "FRONT",
        Side => "SIDE",
        Back => "BACK",
    }
);

coded_enum!(
    /// Workout session status
    SessionStatus {
        Completed => "CMP",
        Skipped => "SKP",
        Planned => "PLN",
        InProgress => "INP",
    }
);

coded_enum!(
    /// Kind of logged set; only working sets count toward personal records
    SetType {
        WarmUp => "WARM",
        Working => "WORK",
        Feeder => "FEED",
        Drop => "DROP",
        Finisher => "FIN",
    }
);

// ========================================
// Accounts
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_student: bool,
    pub is_teacher: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub specialties: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user together with whichever profiles it has
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub student: Option<StudentProfile>,
    pub teacher: Option<TeacherProfile>,
}

// ========================================
// Fact records
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPlan {
    pub id: Uuid,
    /// Owning student's user account
    pub student_user_id: Uuid,
    pub teacher_user_id: Option<Uuid>,
    pub name: String,
    pub goal: DietGoal,
    pub description: Option<String>,
    pub target_calories: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Training {
    pub id: Uuid,
    /// Owning student profile
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub goal: TrainingGoal,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Progress log entry written by a student to their teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub receiver_teacher_id: Uuid,
    pub rating: u32,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPhoto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_type: PhotoType,
    pub image_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

// ========================================
// Workout tracking
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub muscle_group: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub id: Uuid,
    pub set_type: SetType,
    pub set_number: u32,
    pub repetitions: u32,
    pub weight_kg: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub position: u32,
    pub notes: Option<String>,
    pub sets: Vec<SetLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseLog>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_codes() {
        assert_eq!(DietGoal::Maintenance.code(), "MAINT");
        assert_eq!(TrainingGoal::WeightLoss.code(), "WL");
        assert_eq!(SetType::Working.code(), "WORK");
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&SessionStatus::InProgress).unwrap();
        assert_eq!(json, "\"INP\"");
        let parsed: PhotoType = serde_json::from_str("\"SIDE\"").unwrap();
        assert_eq!(parsed, PhotoType::Side);
    }
}
