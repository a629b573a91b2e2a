//! Teacher-student relationship registry
//!
//! The relationship is the join point that scopes every evaluation fact to one
//! coaching pairing. Nothing in the schema prevents a student from having more
//! than one active coach, so lookups go through an explicit
//! [`ActiveRelationshipPolicy`].

use crate::evaluation::EvaluationStore;
use crate::events::StudentRef;
use crate::{uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// A teacher-student pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Relationship {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: uuid_utils::column(row, "id")?,
            teacher_id: uuid_utils::column(row, "teacher_id")?,
            student_id: uuid_utils::column(row, "student_id")?,
            assigned_at: row.try_get("assigned_at")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

/// Which relationship receives evaluation credit when a student has several active coaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveRelationshipPolicy {
    /// Earliest `assigned_at` wins (ties by id)
    #[default]
    Oldest,
    /// Latest `assigned_at` wins
    MostRecent,
    /// More than one active relationship is a conflict error
    Reject,
}

impl ActiveRelationshipPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveRelationshipPolicy::Oldest => "oldest",
            ActiveRelationshipPolicy::MostRecent => "most_recent",
            ActiveRelationshipPolicy::Reject => "reject",
        }
    }

    /// Pick from active relationships of a single student
    pub fn choose(self, mut candidates: Vec<Relationship>) -> Result<Option<Relationship>> {
        candidates.sort_by(|a, b| {
            a.assigned_at
                .cmp(&b.assigned_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        match self {
            ActiveRelationshipPolicy::Oldest => Ok(candidates.into_iter().next()),
            ActiveRelationshipPolicy::MostRecent => Ok(candidates.pop()),
            ActiveRelationshipPolicy::Reject => {
                if candidates.len() > 1 {
                    let ids: Vec<String> = candidates.iter().map(|r| r.id.to_string()).collect();
                    return Err(Error::Conflict(format!(
                        "student {} has {} active relationships: {}",
                        candidates[0].student_id,
                        candidates.len(),
                        ids.join(", ")
                    )));
                }
                Ok(candidates.pop())
            }
        }
    }
}

impl fmt::Display for ActiveRelationshipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActiveRelationshipPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" => Ok(ActiveRelationshipPolicy::Oldest),
            "most_recent" | "most-recent" => Ok(ActiveRelationshipPolicy::MostRecent),
            "reject" => Ok(ActiveRelationshipPolicy::Reject),
            other => Err(format!(
                "unknown active relationship policy '{}' (expected oldest, most_recent or reject)",
                other
            )),
        }
    }
}

/// Repository for teacher-student relationships
#[derive(Clone)]
pub struct RelationshipRegistry {
    pool: SqlitePool,
    policy: ActiveRelationshipPolicy,
}

const SELECT_RELATIONSHIP: &str =
    "SELECT id, teacher_id, student_id, assigned_at, is_active FROM teacher_students";

impl RelationshipRegistry {
    pub fn new(pool: SqlitePool, policy: ActiveRelationshipPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> ActiveRelationshipPolicy {
        self.policy
    }

    /// Assign a student to a teacher
    ///
    /// An existing pairing is re-activated rather than duplicated, taking the
    /// new `assigned_at`; an already active pairing is returned as is. The
    /// evaluation aggregate is provisioned in the same transaction. Returns the
    /// relationship and whether it was newly created.
    pub async fn assign(
        &self,
        teacher_id: Uuid,
        student_id: Uuid,
        assigned_at: DateTime<Utc>,
    ) -> Result<(Relationship, bool)> {
        let mut tx = self.pool.begin().await?;

        let teacher_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teachers WHERE id = ?)")
                .bind(teacher_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        if !teacher_exists {
            return Err(Error::NotFound(format!("teacher {}", teacher_id)));
        }

        let student_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE id = ?)")
                .bind(student_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        if !student_exists {
            return Err(Error::NotFound(format!("student {}", student_id)));
        }

        let existing = sqlx::query(&format!(
            "{} WHERE teacher_id = ? AND student_id = ?",
            SELECT_RELATIONSHIP
        ))
        .bind(teacher_id.to_string())
        .bind(student_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| Relationship::from_row(&row))
        .transpose()?;

        let (relationship, created) = match existing {
            Some(mut relationship) => {
                if !relationship.is_active {
                    sqlx::query(
                        "UPDATE teacher_students SET is_active = 1, assigned_at = ? WHERE id = ?",
                    )
                    .bind(assigned_at)
                    .bind(relationship.id.to_string())
                    .execute(&mut *tx)
                    .await?;
                    relationship.is_active = true;
                    relationship.assigned_at = assigned_at;
                    info!("Re-activated relationship {}", relationship.id);
                }
                (relationship, false)
            }
            None => {
                let relationship = Relationship {
                    id: uuid_utils::generate(),
                    teacher_id,
                    student_id,
                    assigned_at,
                    is_active: true,
                };
                sqlx::query(
                    "INSERT INTO teacher_students (id, teacher_id, student_id, assigned_at, is_active)
                     VALUES (?, ?, ?, ?, 1)",
                )
                .bind(relationship.id.to_string())
                .bind(teacher_id.to_string())
                .bind(student_id.to_string())
                .bind(assigned_at)
                .execute(&mut *tx)
                .await?;
                info!(
                    "Assigned student {} to teacher {} ({})",
                    student_id, teacher_id, relationship.id
                );
                (relationship, true)
            }
        };

        EvaluationStore::insert_if_absent(&mut *tx, relationship.id, assigned_at).await?;

        tx.commit().await?;
        Ok((relationship, created))
    }

    /// Stop a relationship from receiving evaluation credit
    pub async fn deactivate(&self, relationship_id: Uuid) -> Result<Relationship> {
        let result = sqlx::query("UPDATE teacher_students SET is_active = 0 WHERE id = ?")
            .bind(relationship_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("relationship {}", relationship_id)));
        }

        info!("Deactivated relationship {}", relationship_id);
        self.get(relationship_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("relationship {}", relationship_id)))
    }

    pub async fn get(&self, relationship_id: Uuid) -> Result<Option<Relationship>> {
        sqlx::query(&format!("{} WHERE id = ?", SELECT_RELATIONSHIP))
            .bind(relationship_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Relationship::from_row(&row))
            .transpose()
    }

    pub async fn list_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Relationship>> {
        let rows = sqlx::query(&format!(
            "{} WHERE teacher_id = ? ORDER BY assigned_at",
            SELECT_RELATIONSHIP
        ))
        .bind(teacher_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Relationship::from_row).collect()
    }

    /// Every relationship, active or not
    pub async fn list_all(&self) -> Result<Vec<Relationship>> {
        let rows = sqlx::query(&format!("{} ORDER BY assigned_at", SELECT_RELATIONSHIP))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Relationship::from_row).collect()
    }

    /// The relationship currently credited with the student's facts
    ///
    /// Returns `None` when the student has no active coach. With several
    /// active coaches the configured policy decides.
    pub async fn find_active_relationship(&self, student_id: Uuid) -> Result<Option<Relationship>> {
        let rows = sqlx::query(&format!(
            "{} WHERE student_id = ? AND is_active = 1",
            SELECT_RELATIONSHIP
        ))
        .bind(student_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .iter()
            .map(Relationship::from_row)
            .collect::<Result<Vec<_>>>()?;

        if candidates.len() > 1 {
            debug!(
                "Student {} has {} active relationships, applying policy {}",
                student_id,
                candidates.len(),
                self.policy
            );
        }

        self.policy.choose(candidates)
    }

    /// Student profile id for a user account, if the user is a student
    pub async fn resolve_student_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT id FROM students WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| uuid_utils::column(&row, "id")).transpose()
    }

    /// Resolve a fact owner reference to a student profile id
    pub async fn resolve_student(&self, owner: StudentRef) -> Result<Option<Uuid>> {
        match owner {
            StudentRef::Student(student_id) => Ok(Some(student_id)),
            StudentRef::User(user_id) => self.resolve_student_for_user(user_id).await,
        }
    }

    /// User account behind a student profile
    pub async fn student_user_id(&self, student_id: Uuid) -> Result<Uuid> {
        let row = sqlx::query("SELECT user_id FROM students WHERE id = ?")
            .bind(student_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("student {}", student_id)))?;

        uuid_utils::column(&row, "user_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn relationship(day: u32) -> Relationship {
        Relationship {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            assigned_at: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
            is_active: true,
        }
    }

    #[test]
    fn test_policy_oldest_picks_first_assigned() {
        let early = relationship(1);
        let late = relationship(20);
        let chosen = ActiveRelationshipPolicy::Oldest
            .choose(vec![late, early.clone()])
            .unwrap();
        assert_eq!(chosen, Some(early));
    }

    #[test]
    fn test_policy_most_recent_picks_last_assigned() {
        let early = relationship(1);
        let late = relationship(20);
        let chosen = ActiveRelationshipPolicy::MostRecent
            .choose(vec![late.clone(), early])
            .unwrap();
        assert_eq!(chosen, Some(late));
    }

    #[test]
    fn test_policy_reject_conflicts_on_two() {
        let err = ActiveRelationshipPolicy::Reject
            .choose(vec![relationship(1), relationship(2)])
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_policy_reject_accepts_single() {
        let only = relationship(3);
        let chosen = ActiveRelationshipPolicy::Reject
            .choose(vec![only.clone()])
            .unwrap();
        assert_eq!(chosen, Some(only));
    }

    #[test]
    fn test_every_policy_returns_none_for_empty() {
        for policy in [
            ActiveRelationshipPolicy::Oldest,
            ActiveRelationshipPolicy::MostRecent,
            ActiveRelationshipPolicy::Reject,
        ] {
            assert_eq!(policy.choose(Vec::new()).unwrap(), None);
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "most-recent".parse::<ActiveRelationshipPolicy>().unwrap(),
            ActiveRelationshipPolicy::MostRecent
        );
        assert_eq!(
            " Reject ".parse::<ActiveRelationshipPolicy>().unwrap(),
            ActiveRelationshipPolicy::Reject
        );
        assert!("newest".parse::<ActiveRelationshipPolicy>().is_err());
    }
}
