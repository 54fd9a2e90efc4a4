mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, TestApp, create_test_student, create_test_user, link_guardian};
use schoolbase_auth::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_marking_twice_overwrites_the_day(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 1A").await;

    let (status, body) = app
        .post(
            "/api/attendance",
            &token,
            json!({
                "date": "2024-03-04",
                "items": [{ "student_id": student_id, "status": "ABSENT", "remarks": "sick" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 1);

    let (status, _) = app
        .post(
            "/api/attendance",
            &token,
            json!({
                "date": "2024-03-04",
                "items": [{ "student_id": student_id, "status": "present" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let (status, sheet) = app
        .get("/api/attendance?date=2024-03-04&class_name=Form%201A", &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{sheet}");
    let items = sheet["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "PRESENT");
    assert!(items[0]["remarks"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_every_mark_notifies_in_app_but_only_concerning_ones_email(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 2B").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, student_id).await;

    for (date, status) in [("2024-03-04", "PRESENT"), ("2024-03-05", "LATE")] {
        let (code, body) = app
            .post(
                "/api/attendance",
                &token,
                json!({ "date": date, "items": [{ "student_id": student_id, "status": status }] }),
            )
            .await;
        assert_eq!(code, StatusCode::OK, "{body}");
    }

    let parent_token = app.login(&parent.email, TEST_PASSWORD).await;
    let (status, notifications) = app.get("/api/notifications", &parent_token).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .all(|n| n["notification_type"] == "attendance_marked")
    );

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.ends_with("Late"), "{}", sent[0].text);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_student_rolls_back_the_whole_sheet(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 2B").await;

    let (status, _) = app
        .post(
            "/api/attendance",
            &token,
            json!({
                "date": "2024-03-04",
                "items": [
                    { "student_id": student_id, "status": "PRESENT" },
                    { "student_id": uuid::Uuid::new_v4(), "status": "ABSENT" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_accountant_cannot_mark_attendance(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 2B").await;

    let (status, _) = app
        .post(
            "/api/attendance",
            &token,
            json!({ "date": "2024-03-04", "items": [{ "student_id": student_id, "status": "PRESENT" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
