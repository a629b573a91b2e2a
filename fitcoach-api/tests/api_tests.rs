//! Integration tests for fitcoach-api endpoints
//!
//! Each test runs the router against a fresh SQLite database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fitcoach_api::{build_router, AppState};
use fitcoach_common::db::init_database;
use fitcoach_common::events::EventBus;
use fitcoach_common::relationships::ActiveRelationshipPolicy;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a temporary database, plus the pool behind it
async fn setup_app_with_pool() -> (TempDir, Router, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitcoach.db")).await.unwrap();
    let state = AppState::new(pool.clone(), EventBus::new(100), ActiveRelationshipPolicy::Oldest);
    (dir, build_router(state), pool)
}

async fn setup_app() -> (TempDir, Router) {
    let (dir, app, _) = setup_app_with_pool().await;
    (dir, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Creates a student and a teacher and pairs them; returns (student, teacher, relationship)
async fn coached_student(app: &Router) -> (Value, Value, Value) {
    let (status, student) = send(
        app,
        post_json(
            "/api/users",
            json!({
                "username": "ana",
                "email": "ana@example.com",
                "student": {"age": 27, "weight_kg": 64.0, "height_cm": 170.0}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", student);

    let (status, teacher) = send(
        app,
        post_json(
            "/api/users",
            json!({
                "username": "coach",
                "email": "coach@example.com",
                "teacher": {"bio": "Powerlifting"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", teacher);

    let (status, relationship) = send(
        app,
        post_json(
            "/api/relationships",
            json!({
                "teacher_id": teacher["teacher"]["id"],
                "student_id": student["student"]["id"],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", relationship);

    (student, teacher, relationship)
}

async fn evaluation(app: &Router, relationship_id: &str) -> Value {
    let uri = format!("/api/relationships/{}/evaluation", relationship_id);
    let (status, body) = send(app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fitcoach-api");
    assert_eq!(body["database"], "ok");
    assert!(body["version"].is_string());
}

// =============================================================================
// Accounts and relationships
// =============================================================================

#[tokio::test]
async fn test_duplicate_username_returns_409() {
    let (_dir, app) = setup_app().await;
    let user = json!({"username": "sam", "email": "sam@example.com"});

    let (status, _) = send(&app, post_json("/api/users", user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, post_json("/api/users", user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_new_relationship_has_empty_evaluation() {
    let (_dir, app) = setup_app().await;
    let (_, _, relationship) = coached_student(&app).await;

    let uri = format!("/api/relationships/{}/evaluation", relationship["id"].as_str().unwrap());
    let (status, body) = send(&app, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completion_percentage"], 0.0);
    assert_eq!(body["complete"], false);
    assert_eq!(body["missing"].as_array().unwrap().len(), 5);
    assert_eq!(body["relationship_id"], relationship["id"]);
}

#[tokio::test]
async fn test_reassigning_pair_returns_200_and_same_relationship() {
    let (_dir, app) = setup_app().await;
    let (student, teacher, relationship) = coached_student(&app).await;
    let id = relationship["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        post_json(&format!("/api/relationships/{}/deactivate", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = send(
        &app,
        post_json(
            "/api/relationships",
            json!({
                "teacher_id": teacher["teacher"]["id"],
                "student_id": student["student"]["id"],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], relationship["id"]);
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn test_unknown_relationship_returns_404() {
    let (_dir, app) = setup_app().await;
    let uri = format!("/api/relationships/{}/evaluation", uuid::Uuid::new_v4());

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_missing_aggregate_is_not_created_by_read() {
    let (_dir, app, pool) = setup_app_with_pool().await;
    let (_, _, relationship) = coached_student(&app).await;
    sqlx::query("DELETE FROM student_evaluations")
        .execute(&pool)
        .await
        .unwrap();

    let uri = format!("/api/relationships/{}/evaluation", relationship["id"].as_str().unwrap());
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_evaluations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// =============================================================================
// Fact records drive the evaluation
// =============================================================================

#[tokio::test]
async fn test_fact_creation_updates_evaluation() {
    let (_dir, app) = setup_app().await;
    let (student, teacher, relationship) = coached_student(&app).await;
    let relationship_id = relationship["id"].as_str().unwrap();

    let (status, photo) = send(
        &app,
        post_json(
            "/api/progress-photos",
            json!({
                "user_id": student["user"]["id"],
                "photo_type": "FRONT",
                "image_path": "photos/ana-front.jpg"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", photo);

    // Credited before the create response was sent
    let body = evaluation(&app, relationship_id).await;
    assert_eq!(body["has_initial_photos"], true);
    assert_eq!(body["initial_photos_date"], photo["created_at"]);
    assert_eq!(body["completion_percentage"], 20.0);

    let (status, _) = send(
        &app,
        post_json(
            "/api/trainings",
            json!({
                "student_id": student["student"]["id"],
                "teacher_id": teacher["teacher"]["id"],
                "name": "Full body",
                "goal": "GEN"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let body = evaluation(&app, relationship_id).await;
    assert_eq!(body["has_training_plan"], true);
    assert_eq!(body["completion_percentage"], 40.0);

    let (status, list) = send(
        &app,
        get(&format!(
            "/api/teachers/{}/evaluations",
            teacher["teacher"]["id"].as_str().unwrap()
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fact_for_unknown_user_returns_404() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/body-measurements",
            json!({
                "user_id": uuid::Uuid::new_v4(),
                "date": "2024-02-01",
                "weight_kg": 70.0
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
}

#[tokio::test]
async fn test_invalid_fact_returns_400() {
    let (_dir, app) = setup_app().await;
    let (student, teacher, _) = coached_student(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/feedback",
            json!({
                "user_id": student["user"]["id"],
                "receiver_teacher_id": teacher["teacher"]["id"],
                "rating": 9,
                "message": "Great week"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Strength
// =============================================================================

#[tokio::test]
async fn test_one_rep_max_estimate() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/api/strength/one-rep-max?weight=100&reps=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estimated_one_rep_max"], 100.0);

    let (status, body) = send(&app, get("/api/strength/one-rep-max?weight=100&reps=10")).await;
    assert_eq!(status, StatusCode::OK);
    let estimate = body["estimated_one_rep_max"].as_f64().unwrap();
    assert!((estimate - 133.333).abs() < 0.001);
}

#[tokio::test]
async fn test_one_rep_max_invalid_input_returns_400() {
    let (_dir, app) = setup_app().await;

    let (status, _) = send(&app, get("/api/strength/one-rep-max?weight=100&reps=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/strength/one-rep-max?weight=-20&reps=5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_personal_record_endpoint() {
    let (_dir, app) = setup_app().await;
    let (student, _, _) = coached_student(&app).await;
    let user_id = student["user"]["id"].as_str().unwrap().to_string();

    let (status, exercise) = send(
        &app,
        post_json("/api/exercises", json!({"name": "Overhead press", "muscle_group": "shoulders"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let exercise_id = exercise["id"].as_str().unwrap().to_string();

    let uri = format!("/api/users/{}/personal-records/{}", user_id, exercise_id);
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, session) = send(
        &app,
        post_json(
            "/api/workout-sessions",
            json!({
                "user_id": user_id,
                "date": "2024-04-10",
                "status": "CMP",
                "exercises": [{
                    "exercise_id": exercise_id,
                    "sets": [
                        {"set_type": "WARM", "repetitions": 10, "weight_kg": 20.0},
                        {"repetitions": 5, "weight_kg": 40.0},
                        {"repetitions": 3, "weight_kg": 45.0}
                    ]
                }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", session);

    let (status, record) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["weight_kg"], 45.0);
    assert_eq!(record["repetitions"], 3);
    assert_eq!(record["achieved_on"], "2024-04-10");
    assert_eq!(record["volume"], 135.0);
}
