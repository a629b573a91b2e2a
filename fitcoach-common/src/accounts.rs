//! User accounts with optional student and teacher profiles

use crate::db::{Account, StudentProfile, TeacherProfile, User};
use crate::{uuid_utils, Error, Result};
use chrono::Utc;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudentProfile {
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTeacherProfile {
    pub bio: Option<String>,
    pub specialties: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub student: Option<NewStudentProfile>,
    pub teacher: Option<NewTeacherProfile>,
}

impl NewAccount {
    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }
        if !self.email.contains('@') {
            return Err(Error::InvalidInput(format!("invalid email: {}", self.email)));
        }
        if let Some(student) = &self.student {
            if !(student.weight_kg.is_finite() && student.weight_kg > 0.0) {
                return Err(Error::InvalidInput("weight_kg must be positive".to_string()));
            }
            if !(student.height_cm.is_finite() && student.height_cm > 0.0) {
                return Err(Error::InvalidInput("height_cm must be positive".to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user and its profiles in one transaction
    pub async fn create(&self, input: NewAccount) -> Result<Account> {
        input.validate()?;

        let now = Utc::now();
        let user = User {
            id: uuid_utils::generate(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            is_student: input.student.is_some(),
            is_teacher: input.teacher.is_some(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, email, is_student, is_teacher, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_student)
        .bind(user.is_teacher)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let err = Error::from(e);
            if err.is_unique_violation() {
                return Err(Error::Conflict(format!(
                    "username or email already in use: {}",
                    user.username
                )));
            }
            return Err(err);
        }

        let student = match input.student {
            Some(profile) => {
                let student = StudentProfile {
                    id: uuid_utils::generate(),
                    user_id: user.id,
                    age: profile.age,
                    weight_kg: profile.weight_kg,
                    height_cm: profile.height_cm,
                    created_at: now,
                };
                sqlx::query(
                    "INSERT INTO students (id, user_id, age, weight_kg, height_cm, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(student.id.to_string())
                .bind(user.id.to_string())
                .bind(student.age)
                .bind(student.weight_kg)
                .bind(student.height_cm)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                Some(student)
            }
            None => None,
        };

        let teacher = match input.teacher {
            Some(profile) => {
                let teacher = TeacherProfile {
                    id: uuid_utils::generate(),
                    user_id: user.id,
                    bio: profile.bio,
                    specialties: profile.specialties,
                    created_at: now,
                };
                sqlx::query(
                    "INSERT INTO teachers (id, user_id, bio, specialties, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(teacher.id.to_string())
                .bind(user.id.to_string())
                .bind(&teacher.bio)
                .bind(&teacher.specialties)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                Some(teacher)
            }
            None => None,
        };

        tx.commit().await?;
        info!(
            "Created user {} (student: {}, teacher: {})",
            user.username, user.is_student, user.is_teacher
        );

        Ok(Account {
            user,
            student,
            teacher,
        })
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<Account>> {
        let Some(row) = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let user = user_from_row(&row)?;

        let student = sqlx::query("SELECT * FROM students WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| student_from_row(&row))
            .transpose()?;

        let teacher = sqlx::query("SELECT * FROM teachers WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| teacher_from_row(&row))
            .transpose()?;

        Ok(Some(Account {
            user,
            student,
            teacher,
        }))
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: uuid_utils::column(row, "id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_student: row.try_get("is_student")?,
        is_teacher: row.try_get("is_teacher")?,
        created_at: row.try_get("created_at")?,
    })
}

fn student_from_row(row: &SqliteRow) -> Result<StudentProfile> {
    Ok(StudentProfile {
        id: uuid_utils::column(row, "id")?,
        user_id: uuid_utils::column(row, "user_id")?,
        age: row.try_get("age")?,
        weight_kg: row.try_get("weight_kg")?,
        height_cm: row.try_get("height_cm")?,
        created_at: row.try_get("created_at")?,
    })
}

fn teacher_from_row(row: &SqliteRow) -> Result<TeacherProfile> {
    Ok(TeacherProfile {
        id: uuid_utils::column(row, "id")?,
        user_id: uuid_utils::column(row, "user_id")?,
        bio: row.try_get("bio")?,
        specialties: row.try_get("specialties")?,
        created_at: row.try_get("created_at")?,
    })
}
