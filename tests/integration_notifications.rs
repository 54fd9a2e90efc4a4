mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_student, create_test_user, link_guardian};
use schoolbase_auth::Role;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn insert_notification(pool: &PgPool, user_id: Uuid, student_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, notification_type, title, message, data)
        VALUES ($1, 'grade_updated', 'Grade Updated', 'A new score was recorded', $2)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(json!({ "student_id": student_id }))
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_read_updates_unread_count(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    let student = create_test_student(&pool, "Female", "Form 1A").await;
    let first = insert_notification(&pool, parent.id, student).await;
    insert_notification(&pool, parent.id, student).await;
    let token = app.login(&parent.email, common::TEST_PASSWORD).await;

    let (_, count) = app.get("/api/notifications/unread-count", &token).await;
    assert_eq!(count["count"], 2);

    let (status, marked) = app
        .request("PUT", &format!("/api/notifications/{first}/read"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["is_read"], true);

    let (_, unread) = app.get("/api/notifications?unread_only=true", &token).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let (_, result) = app
        .request("PUT", "/api/notifications/read-all", Some(&token), None)
        .await;
    assert_eq!(result["updated"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_mark_someone_elses_notification(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let owner = create_test_user(&pool, &[Role::Parent], None).await;
    let student = create_test_student(&pool, "Male", "Form 1A").await;
    let id = insert_notification(&pool, owner.id, student).await;

    let intruder = app.token_for(&[Role::Parent], None).await;
    let (status, _) = app
        .request("PUT", &format!("/api/notifications/{id}/read"), Some(&intruder), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_guardian_sees_only_linked_students(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    let linked = create_test_student(&pool, "Female", "Form 1A").await;
    let unlinked = create_test_student(&pool, "Male", "Form 1A").await;
    link_guardian(&pool, parent.id, linked).await;
    insert_notification(&pool, parent.id, linked).await;
    let token = app.login(&parent.email, common::TEST_PASSWORD).await;

    let (status, students) = app.get("/api/notifications/guardian/students", &token).await;
    assert_eq!(status, StatusCode::OK);
    let students = students.as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["id"], json!(linked));

    let (status, notifications) = app
        .get(&format!("/api/notifications/guardian/students/{linked}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifications.as_array().unwrap().len(), 1);

    let (status, body) = app
        .get(&format!("/api/notifications/guardian/students/{unlinked}"), &token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You are not linked to this student");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_guardian_endpoints_need_parent_role(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app.get("/api/notifications/guardian/students", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_preferences_default_until_saved(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Parent], None).await;

    let (status, prefs) = app.get("/api/notifications/preferences", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["timetable_updated"], false);
    assert_eq!(prefs["email_enabled"], true);

    let (_, saved) = app
        .put(
            "/api/notifications/preferences",
            &token,
            json!({ "email_enabled": false }),
        )
        .await;
    assert_eq!(saved["email_enabled"], false);
    assert_eq!(saved["fee_reminder"], true);

    let (_, reloaded) = app.get("/api/notifications/preferences", &token).await;
    assert_eq!(reloaded["email_enabled"], false);
}
