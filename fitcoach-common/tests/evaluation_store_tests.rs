//! Evaluation aggregate persistence: flag writes, completion and timestamps

use chrono::{Duration, Utc};
use fitcoach_common::accounts::{AccountStore, NewAccount, NewStudentProfile, NewTeacherProfile};
use fitcoach_common::db::init_database;
use fitcoach_common::evaluation::{Evaluation, EvaluationStore, FLAG_COUNT};
use fitcoach_common::events::FactKind;
use fitcoach_common::relationships::{ActiveRelationshipPolicy, RelationshipRegistry};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Database with one active relationship; returns its id
async fn setup() -> (TempDir, SqlitePool, EvaluationStore, Uuid) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitcoach.db")).await.unwrap();
    let accounts = AccountStore::new(pool.clone());

    let student = accounts
        .create(NewAccount {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            student: Some(NewStudentProfile {
                age: 27,
                weight_kg: 64.0,
                height_cm: 170.0,
            }),
            teacher: None,
        })
        .await
        .unwrap();
    let teacher = accounts
        .create(NewAccount {
            username: "coach".to_string(),
            email: "coach@example.com".to_string(),
            student: None,
            teacher: Some(NewTeacherProfile::default()),
        })
        .await
        .unwrap();

    let (relationship, _) = RelationshipRegistry::new(pool.clone(), ActiveRelationshipPolicy::Oldest)
        .assign(
            teacher.teacher.unwrap().id,
            student.student.unwrap().id,
            Utc::now(),
        )
        .await
        .unwrap();

    (dir, pool.clone(), EvaluationStore::new(pool), relationship.id)
}

/// Replace the relationship's aggregate with an empty one
async fn fresh(pool: &SqlitePool, store: &EvaluationStore, relationship_id: Uuid) -> Evaluation {
    sqlx::query("DELETE FROM student_evaluations WHERE teacher_student_id = ?")
        .bind(relationship_id.to_string())
        .execute(pool)
        .await
        .unwrap();
    store.get_or_create(relationship_id).await.unwrap()
}

async fn reload(store: &EvaluationStore, relationship_id: Uuid) -> Evaluation {
    store
        .get_for_relationship(relationship_id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_new_evaluation_is_empty() {
    let (_dir, _pool, store, relationship_id) = setup().await;

    let evaluation = reload(&store, relationship_id).await;
    assert_eq!(evaluation.satisfied_count(), 0);
    assert_eq!(evaluation.completion_percentage(), 0.0);
    assert!(!evaluation.is_complete());
    assert_eq!(evaluation.missing().len(), FLAG_COUNT);
    assert!(evaluation.completed_at.is_none());
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let (_dir, _pool, store, relationship_id) = setup().await;

    let first = store.get_or_create(relationship_id).await.unwrap();
    let second = store.get_or_create(relationship_id).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_completion_percentage_steps() {
    let (_dir, _pool, store, relationship_id) = setup().await;
    let evaluation = reload(&store, relationship_id).await;
    let expected = [20.0, 40.0, 60.0, 80.0, 100.0];

    for (kind, pct) in FactKind::ALL.into_iter().zip(expected) {
        assert!(store.mark_flag(&evaluation, kind, Utc::now()).await.unwrap());
        assert_eq!(reload(&store, relationship_id).await.completion_percentage(), pct);
    }
}

#[tokio::test]
async fn test_completion_every_flag_combination() {
    let (_dir, pool, store, relationship_id) = setup().await;
    let now = Utc::now();

    for mask in 0u32..32 {
        let evaluation = fresh(&pool, &store, relationship_id).await;
        for (bit, kind) in FactKind::ALL.into_iter().enumerate() {
            if mask & (1 << bit) != 0 {
                assert!(store.mark_flag(&evaluation, kind, now).await.unwrap());
            }
        }

        let stored = reload(&store, relationship_id).await;
        let ones = mask.count_ones() as f64;
        assert_eq!(stored.completion_percentage(), 100.0 * ones / 5.0, "mask {:05b}", mask);
        assert_eq!(stored.is_complete(), mask == 31, "mask {:05b}", mask);
        assert_eq!(stored.completed_at.is_some(), mask == 31, "mask {:05b}", mask);
    }
}

#[tokio::test]
async fn test_four_of_five_is_not_complete() {
    let (_dir, pool, store, relationship_id) = setup().await;
    let now = Utc::now();

    for skipped in FactKind::ALL {
        let evaluation = fresh(&pool, &store, relationship_id).await;
        for kind in FactKind::ALL.into_iter().filter(|k| *k != skipped) {
            store.mark_flag(&evaluation, kind, now).await.unwrap();
        }

        let stored = reload(&store, relationship_id).await;
        assert!(!stored.is_complete());
        assert_eq!(stored.missing(), vec![skipped]);
        assert!(stored.completed_at.is_none());
    }
}

#[tokio::test]
async fn test_mark_flag_keeps_first_timestamp() {
    let (_dir, _pool, store, relationship_id) = setup().await;
    let evaluation = reload(&store, relationship_id).await;
    let first = Utc::now();
    let later = first + Duration::hours(3);

    assert!(store.mark_flag(&evaluation, FactKind::DietPlan, first).await.unwrap());
    assert!(!store.mark_flag(&evaluation, FactKind::DietPlan, later).await.unwrap());

    let stored = reload(&store, relationship_id).await;
    assert_eq!(stored.flag_date(FactKind::DietPlan), Some(first));
    assert_eq!(stored.updated_at, first);
}

#[tokio::test]
async fn test_mark_flag_sets_only_its_flag() {
    let (_dir, pool, store, relationship_id) = setup().await;

    for kind in FactKind::ALL {
        let evaluation = fresh(&pool, &store, relationship_id).await;
        store.mark_flag(&evaluation, kind, Utc::now()).await.unwrap();

        let stored = reload(&store, relationship_id).await;
        for other in FactKind::ALL {
            assert_eq!(stored.flag(other), other == kind, "{} after {}", other, kind);
        }
    }
}

#[tokio::test]
async fn test_completed_at_set_by_last_flag() {
    let (_dir, _pool, store, relationship_id) = setup().await;
    let evaluation = reload(&store, relationship_id).await;
    let mut at = Utc::now();

    for kind in FactKind::ALL {
        at += Duration::minutes(1);
        store.mark_flag(&evaluation, kind, at).await.unwrap();
    }

    let stored = reload(&store, relationship_id).await;
    assert_eq!(stored.completed_at, Some(at));

    // Completion is stamped once
    assert!(!store
        .mark_flag(&evaluation, FactKind::ProgressLog, at + Duration::days(1))
        .await
        .unwrap());
    assert_eq!(reload(&store, relationship_id).await.completed_at, Some(at));
}
