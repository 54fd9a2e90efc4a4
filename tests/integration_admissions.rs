mod common;

use axum::http::StatusCode;
use common::TestApp;
use schoolbase_auth::Role;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn submit(app: &TestApp) -> Value {
    let (status, body) = app
        .request(
            "POST",
            "/api/public/applications",
            None,
            Some(json!({
                "first_name": "Amina",
                "last_name": "Otieno",
                "gender": "Female",
                "class_name": "Form 1A",
                "guardian_contact": "+254700000000"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[sqlx::test(migrations = "./migrations")]
async fn test_public_submission_is_pending_with_reference(pool: PgPool) {
    let app = TestApp::new(pool);
    let application = submit(&app).await;

    assert_eq!(application["status"], "pending");
    let reference = application["reference"].as_str().unwrap();
    assert!(!reference.is_empty());

    let (status, body) = app
        .request("GET", &format!("/api/public/applications/{reference}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_approve_creates_student_once(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Registrar], None).await;
    let application = submit(&app).await;
    let uri = format!("/api/applications/{}/approve", application["id"].as_str().unwrap());

    let (status, outcome) = app
        .post(&uri, &token, json!({ "admission_no": "ADM-2024-100" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["application"]["status"], "approved");
    assert_eq!(outcome["student"]["admission_no"], "ADM-2024-100");
    assert_eq!(outcome["student"]["class_name"], "Form 1A");

    let (status, _) = app
        .post(&uri, &token, json!({ "admission_no": "ADM-2024-101" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(students, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rejected_application_cannot_be_approved(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Headmaster], None).await;
    let application = submit(&app).await;
    let id = application["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            &format!("/api/applications/{id}/reject"),
            &token,
            json!({ "reason": "Class is full" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["decision_reason"], "Class is full");

    let (status, _) = app
        .post(
            &format!("/api/applications/{id}/approve"),
            &token,
            json!({ "admission_no": "ADM-2024-200" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_review_applications(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app.get("/api/applications", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
