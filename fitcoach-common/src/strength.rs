//! One-rep-max estimation and personal-record selection

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estimate a one-repetition maximum with the linear Epley approximation
///
/// A single rep is its own maximum; otherwise `weight * (1 + reps / 30)`.
/// Zero reps and negative or non-finite weights are rejected.
///
/// ```
/// use fitcoach_common::strength::estimate_one_rep_max;
///
/// assert_eq!(estimate_one_rep_max(100.0, 1).unwrap(), 100.0);
/// assert!((estimate_one_rep_max(100.0, 10).unwrap() - 133.333).abs() < 0.001);
/// assert!(estimate_one_rep_max(100.0, 0).is_err());
/// ```
pub fn estimate_one_rep_max(weight_kg: f64, reps: u32) -> Result<f64> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight must be a non-negative number, got {}",
            weight_kg
        )));
    }
    if reps == 0 {
        return Err(Error::InvalidInput("reps must be at least 1".to_string()));
    }

    if reps <= 1 {
        return Ok(weight_kg);
    }
    Ok(weight_kg * (1.0 + reps as f64 / 30.0))
}

/// A logged working set, as considered for personal records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSet {
    pub set_log_id: Uuid,
    pub weight_kg: f64,
    pub repetitions: u32,
    /// Date of the session the set belongs to
    pub performed_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Heaviest working set; ties go to the most recent session, then the latest log
pub fn select_personal_record(sets: &[WorkSet]) -> Option<&WorkSet> {
    sets.iter().max_by(|a, b| {
        a.weight_kg
            .total_cmp(&b.weight_kg)
            .then_with(|| a.performed_on.cmp(&b.performed_on))
            .then_with(|| a.created_at.cmp(&b.created_at))
    })
}

/// Personal record for one user and exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub set_log_id: Uuid,
    pub weight_kg: f64,
    pub repetitions: u32,
    pub achieved_on: NaiveDate,
    /// weight × reps
    pub volume: f64,
    /// Absent when the set was logged with zero reps
    pub estimated_one_rep_max: Option<f64>,
}

impl PersonalRecord {
    pub fn from_set(user_id: Uuid, exercise_id: Uuid, set: &WorkSet) -> Self {
        Self {
            user_id,
            exercise_id,
            set_log_id: set.set_log_id,
            weight_kg: set.weight_kg,
            repetitions: set.repetitions,
            achieved_on: set.performed_on,
            volume: set.weight_kg * set.repetitions as f64,
            estimated_one_rep_max: estimate_one_rep_max(set.weight_kg, set.repetitions).ok(),
        }
    }
}
