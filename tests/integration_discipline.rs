mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_student, create_test_user, link_guardian};
use schoolbase_auth::Role;
use serde_json::json;
use sqlx::PgPool;

fn case_body(student_id: uuid::Uuid, severity: &str) -> serde_json::Value {
    json!({
        "student_id": student_id,
        "category": "Bullying",
        "severity": severity,
        "description": "Incident at the dining hall"
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_patron_limited_to_male_students(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Patron], None).await;
    let girl = create_test_student(&pool, "Female", "Form 2A").await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;

    let (status, _) = app.post("/api/discipline/cases", &token, case_body(girl, "Minor")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post("/api/discipline/cases", &token, case_body(boy, "Minor")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "open");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_matron_cannot_read_male_case(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let director = app.token_for(&[Role::DirectorOfDiscipline], None).await;
    let matron = app.token_for(&[Role::Matron], None).await;
    let boy = create_test_student(&pool, "M", "Form 3A").await;

    let (status, case) = app.post("/api/discipline/cases", &director, case_body(boy, "Minor")).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/discipline/cases/{}", case["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, &matron).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, &matron).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&uri, &director).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_id"], json!(boy));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_case_list_filtered_by_gender_scope(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let director = app.token_for(&[Role::DirectorOfDiscipline], None).await;
    let patron = app.token_for(&[Role::Patron], None).await;
    let girl = create_test_student(&pool, "Female", "Form 2A").await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;

    app.post("/api/discipline/cases", &director, case_body(girl, "Minor")).await;
    app.post("/api/discipline/cases", &director, case_body(boy, "Minor")).await;

    let (status, all) = app.get("/api/discipline/cases", &director).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, scoped) = app.get("/api/discipline/cases", &patron).await;
    assert_eq!(status, StatusCode::OK);
    let scoped = scoped.as_array().unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0]["student_id"], json!(boy));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_dean_can_read_but_not_record(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let dean = app.token_for(&[Role::Dean], None).await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;

    let (status, _) = app.get("/api/discipline/cases", &dean).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/discipline/cases", &dean, case_body(boy, "Minor")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_major_case_notifies_linked_guardian(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let director = app.token_for(&[Role::DirectorOfDiscipline], None).await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, boy).await;

    let (status, _) = app.post("/api/discipline/cases", &director, case_body(boy, "Major")).await;
    assert_eq!(status, StatusCode::CREATED);

    let parent_token = app.login(&parent.email, common::TEST_PASSWORD).await;
    let (status, notifications) = app.get("/api/notifications", &parent_token).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["notification_type"], "disciplinary_case");
    assert_eq!(notifications[0]["data"]["student_id"], json!(boy));

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, parent.email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_disabled_preference_suppresses_notification(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let director = app.token_for(&[Role::DirectorOfDiscipline], None).await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, boy).await;
    let parent_token = app.login(&parent.email, common::TEST_PASSWORD).await;

    let (status, prefs) = app
        .put(
            "/api/notifications/preferences",
            &parent_token,
            json!({ "disciplinary_case": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["disciplinary_case"], false);
    assert_eq!(prefs["grade_updated"], true);

    app.post("/api/discipline/cases", &director, case_body(boy, "Major")).await;

    let (_, count) = app.get("/api/notifications/unread-count", &parent_token).await;
    assert_eq!(count["count"], 0);
    assert!(app.notifier.sent().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_link_without_disciplinary_access_is_skipped(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let director = app.token_for(&[Role::DirectorOfDiscipline], None).await;
    let boy = create_test_student(&pool, "Male", "Form 2A").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, boy).await;
    sqlx::query("UPDATE guardian_links SET can_access_disciplinary = FALSE WHERE parent_user_id = $1")
        .bind(parent.id)
        .execute(&pool)
        .await
        .unwrap();

    app.post("/api/discipline/cases", &director, case_body(boy, "Major")).await;

    let parent_token = app.login(&parent.email, common::TEST_PASSWORD).await;
    let (_, notifications) = app.get("/api/notifications", &parent_token).await;
    assert!(notifications.as_array().unwrap().is_empty());
}
