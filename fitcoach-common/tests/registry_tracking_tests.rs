//! Accounts, relationship registry and workout tracking against SQLite

use chrono::{Duration, NaiveDate, Utc};
use fitcoach_common::accounts::{AccountStore, NewAccount, NewStudentProfile, NewTeacherProfile};
use fitcoach_common::db::{init_database, Account, SessionStatus, SetType};
use fitcoach_common::evaluation::EvaluationStore;
use fitcoach_common::relationships::{ActiveRelationshipPolicy, RelationshipRegistry};
use fitcoach_common::tracking::{
    NewExercise, NewExerciseLog, NewSetLog, NewWorkoutSession, TrackingStore,
};
use fitcoach_common::Error;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitcoach.db")).await.unwrap();
    (dir, pool)
}

async fn create_account(pool: &SqlitePool, name: &str, student: bool, teacher: bool) -> Account {
    AccountStore::new(pool.clone())
        .create(NewAccount {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            student: student.then(|| NewStudentProfile {
                age: 31,
                weight_kg: 80.0,
                height_cm: 182.0,
            }),
            teacher: teacher.then(NewTeacherProfile::default),
        })
        .await
        .unwrap()
}

// ========================================
// Accounts
// ========================================

#[tokio::test]
async fn test_account_roundtrip_with_both_profiles() {
    let (_dir, pool) = setup().await;
    let account = create_account(&pool, "dual", true, true).await;

    let loaded = AccountStore::new(pool.clone())
        .get(account.user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.user.username, "dual");
    assert!(loaded.user.is_student && loaded.user.is_teacher);
    assert_eq!(loaded.student.unwrap().id, account.student.unwrap().id);
    assert_eq!(loaded.teacher.unwrap().id, account.teacher.unwrap().id);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let (_dir, pool) = setup().await;
    create_account(&pool, "taken", true, false).await;

    let result = AccountStore::new(pool.clone())
        .create(NewAccount {
            username: "taken".to_string(),
            email: "other@example.com".to_string(),
            student: None,
            teacher: None,
        })
        .await;
    assert!(matches!(result, Err(Error::Conflict(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_invalid_account_input_rejected() {
    let (_dir, pool) = setup().await;
    let result = AccountStore::new(pool.clone())
        .create(NewAccount {
            username: "bad".to_string(),
            email: "not-an-email".to_string(),
            student: None,
            teacher: None,
        })
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

// ========================================
// Relationships
// ========================================

#[tokio::test]
async fn test_assign_provisions_empty_evaluation() {
    let (_dir, pool) = setup().await;
    let student = create_account(&pool, "ana", true, false).await;
    let teacher = create_account(&pool, "coach", false, true).await;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest);

    let (relationship, created) = registry
        .assign(teacher.teacher.unwrap().id, student.student.unwrap().id, Utc::now())
        .await
        .unwrap();
    assert!(created);
    assert!(relationship.is_active);

    let evaluation = EvaluationStore::new(pool.clone())
        .get_for_relationship(relationship.id)
        .await
        .unwrap()
        .expect("evaluation provisioned on assign");
    assert_eq!(evaluation.satisfied_count(), 0);
    assert!(evaluation.completed_at.is_none());
}

#[tokio::test]
async fn test_assign_existing_pair_reactivates() {
    let (_dir, pool) = setup().await;
    let student = create_account(&pool, "ana", true, false).await;
    let teacher = create_account(&pool, "coach", false, true).await;
    let teacher_id = teacher.teacher.unwrap().id;
    let student_id = student.student.unwrap().id;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest);

    let (first, _) = registry.assign(teacher_id, student_id, Utc::now()).await.unwrap();
    let deactivated = registry.deactivate(first.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert!(registry.find_active_relationship(student_id).await.unwrap().is_none());

    let (second, created) = registry.assign(teacher_id, student_id, Utc::now()).await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert!(second.is_active);
    assert_eq!(registry.list_for_teacher(teacher_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reactivated_coach_counts_as_most_recent() {
    let (_dir, pool) = setup().await;
    let student = create_account(&pool, "ana", true, false).await;
    let first = create_account(&pool, "first", false, true).await;
    let second = create_account(&pool, "second", false, true).await;
    let student_id = student.student.unwrap().id;
    let first_id = first.teacher.unwrap().id;
    let second_id = second.teacher.unwrap().id;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::MostRecent);
    let start = Utc::now() - Duration::days(60);

    let (original, _) = registry.assign(first_id, student_id, start).await.unwrap();
    registry.deactivate(original.id).await.unwrap();
    registry
        .assign(second_id, student_id, start + Duration::days(30))
        .await
        .unwrap();

    let returned_at = start + Duration::days(45);
    let (reactivated, created) = registry.assign(first_id, student_id, returned_at).await.unwrap();
    assert!(!created);
    assert_eq!(reactivated.id, original.id);
    assert_eq!(reactivated.assigned_at, returned_at);

    let active = registry.find_active_relationship(student_id).await.unwrap().unwrap();
    assert_eq!(active.id, original.id);

    // Assigning an already active pair leaves its date alone
    let (again, _) = registry
        .assign(first_id, student_id, returned_at + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(again.assigned_at, returned_at);
}

#[tokio::test]
async fn test_assign_unknown_profiles_not_found() {
    let (_dir, pool) = setup().await;
    let teacher = create_account(&pool, "coach", false, true).await;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest);

    let result = registry
        .assign(teacher.teacher.unwrap().id, Uuid::new_v4(), Utc::now())
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let result = registry.deactivate(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_resolve_student_for_user() {
    let (_dir, pool) = setup().await;
    let student = create_account(&pool, "ana", true, false).await;
    let teacher = create_account(&pool, "coach", false, true).await;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest);

    let student_id = student.student.unwrap().id;
    assert_eq!(
        registry.resolve_student_for_user(student.user.id).await.unwrap(),
        Some(student_id)
    );
    assert_eq!(registry.resolve_student_for_user(teacher.user.id).await.unwrap(), None);
    assert_eq!(registry.student_user_id(student_id).await.unwrap(), student.user.id);
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let (_dir, pool) = setup().await;
    let student = create_account(&pool, "ana", true, false).await;
    let teacher = create_account(&pool, "coach", false, true).await;
    let registry = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest);
    let (relationship, _) = registry
        .assign(teacher.teacher.unwrap().id, student.student.unwrap().id, Utc::now())
        .await
        .unwrap();

    let store = EvaluationStore::new(pool.clone());
    let (a, b) = tokio::join!(
        store.get_or_create(relationship.id),
        store.get_or_create(relationship.id)
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_evaluations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// ========================================
// Workout tracking
// ========================================

fn working(weight_kg: f64, repetitions: u32) -> NewSetLog {
    NewSetLog {
        set_type: SetType::Working,
        repetitions,
        weight_kg,
    }
}

#[tokio::test]
async fn test_personal_record_from_logged_sessions() {
    let (_dir, pool) = setup().await;
    let user = create_account(&pool, "lifter", true, false).await;
    let tracking = TrackingStore::new(pool.clone());

    let squat = tracking
        .create_exercise(NewExercise {
            name: "Back squat".to_string(),
            muscle_group: Some("legs".to_string()),
        })
        .await
        .unwrap();

    let session = |day: u32, sets: Vec<NewSetLog>| NewWorkoutSession {
        user_id: user.user.id,
        date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        status: SessionStatus::Completed,
        notes: None,
        exercises: vec![NewExerciseLog {
            exercise_id: squat.id,
            notes: None,
            sets,
        }],
    };

    tracking.record_session(session(1, vec![working(80.0, 5)])).await.unwrap();
    tracking.record_session(session(2, vec![working(100.0, 3)])).await.unwrap();
    let latest = tracking
        .record_session(session(
            3,
            vec![
                NewSetLog {
                    set_type: SetType::WarmUp,
                    repetitions: 10,
                    weight_kg: 140.0,
                },
                working(100.0, 2),
            ],
        ))
        .await
        .unwrap();

    let record = tracking
        .find_personal_record(user.user.id, squat.id)
        .await
        .unwrap()
        .expect("personal record");

    // Warm-up sets never count; the 100 kg tie goes to the later session
    assert_eq!(record.weight_kg, 100.0);
    assert_eq!(record.achieved_on, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    assert_eq!(record.set_log_id, latest.exercises[0].sets[1].id);
    assert_eq!(record.volume, 200.0);
    let one_rm = record.estimated_one_rep_max.unwrap();
    assert!((one_rm - 100.0 * (1.0 + 2.0 / 30.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_personal_record_absent_without_work_sets() {
    let (_dir, pool) = setup().await;
    let user = create_account(&pool, "lifter", true, false).await;
    let tracking = TrackingStore::new(pool.clone());
    let bench = tracking
        .create_exercise(NewExercise {
            name: "Bench press".to_string(),
            muscle_group: None,
        })
        .await
        .unwrap();

    assert!(tracking
        .find_personal_record(user.user.id, bench.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_session_numbering_and_validation() {
    let (_dir, pool) = setup().await;
    let user = create_account(&pool, "lifter", true, false).await;
    let tracking = TrackingStore::new(pool.clone());
    let row = tracking
        .create_exercise(NewExercise {
            name: "Barbell row".to_string(),
            muscle_group: Some("back".to_string()),
        })
        .await
        .unwrap();

    let session = tracking
        .record_session(NewWorkoutSession {
            user_id: user.user.id,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            status: SessionStatus::InProgress,
            notes: Some("deload".to_string()),
            exercises: vec![NewExerciseLog {
                exercise_id: row.id,
                notes: None,
                sets: vec![working(60.0, 8), working(60.0, 8), working(60.0, 7)],
            }],
        })
        .await
        .unwrap();
    let numbers: Vec<u32> = session.exercises[0].sets.iter().map(|s| s.set_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(session.exercises[0].position, 1);

    let negative = tracking
        .record_session(NewWorkoutSession {
            user_id: user.user.id,
            date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            status: SessionStatus::Completed,
            notes: None,
            exercises: vec![NewExerciseLog {
                exercise_id: row.id,
                notes: None,
                sets: vec![working(-1.0, 5)],
            }],
        })
        .await;
    assert!(matches!(negative, Err(Error::InvalidInput(_))));

    let unknown_exercise = tracking
        .record_session(NewWorkoutSession {
            user_id: user.user.id,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            status: SessionStatus::Completed,
            notes: None,
            exercises: vec![NewExerciseLog {
                exercise_id: Uuid::new_v4(),
                notes: None,
                sets: vec![],
            }],
        })
        .await;
    assert!(matches!(unknown_exercise, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_exercise_name_is_conflict() {
    let (_dir, pool) = setup().await;
    let tracking = TrackingStore::new(pool.clone());
    let input = NewExercise {
        name: "Deadlift".to_string(),
        muscle_group: None,
    };

    tracking.create_exercise(input.clone()).await.unwrap();
    let result = tracking.create_exercise(input).await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}
