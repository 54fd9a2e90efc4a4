mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, TestApp, create_test_student, create_test_user, link_guardian};
use schoolbase_auth::Role;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_template(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, template) = app
        .post("/api/communication/templates", token, body)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{template}");
    template
}

#[sqlx::test(migrations = "./migrations")]
async fn test_template_keys_are_unique(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Registrar], None).await;

    let first = create_template(
        &app,
        &token,
        json!({ "key": "closure", "subject": "School closed on {date}" }),
    )
    .await;
    assert_eq!(first["is_active"], true);

    let (status, _) = app
        .post(
            "/api/communication/templates",
            &token,
            json!({ "key": "closure", "subject": "Duplicate" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let second = create_template(&app, &token, json!({ "key": "welcome", "subject": "Welcome" })).await;
    let (status, _) = app
        .put(
            &format!("/api/communication/templates/{}", second["id"].as_str().unwrap()),
            &token,
            json!({ "key": "closure" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = app.get("/api/communication/templates", &token).await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["closure", "welcome"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_a_missing_template_is_no_content(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Headmaster], None).await;
    let template = create_template(&app, &token, json!({ "key": "k", "subject": "s" })).await;
    let uri = format!("/api/communication/templates/{}", template["id"].as_str().unwrap());

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_renders_template_params(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Registrar], None).await;
    create_template(
        &app,
        &token,
        json!({
            "key": "fee_receipt",
            "subject": "Receipt for {student}",
            "text_body": "We received {amount} for {student}.",
            "html_body": "<p>{amount}</p>"
        }),
    )
    .await;

    let (status, report) = app
        .post(
            "/api/communication/send",
            &token,
            json!({
                "to": "parent@school.test",
                "key": "fee_receipt",
                "params": { "student": "Amina", "amount": "KES 500.00" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["sent"], 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "parent@school.test");
    assert_eq!(sent[0].subject, "Receipt for Amina");
    assert_eq!(sent[0].text, "We received KES 500.00 for Amina.");
    assert_eq!(sent[0].html.as_deref(), Some("<p>KES 500.00</p>"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_needs_a_subject_and_an_active_template(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::ItSupport], None).await;

    let (status, _) = app
        .post(
            "/api/communication/send",
            &token,
            json!({ "to": "parent@school.test", "text_body": "No subject" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    create_template(
        &app,
        &token,
        json!({ "key": "retired", "subject": "Old", "is_active": false }),
    )
    .await;
    let (status, _) = app
        .post(
            "/api/communication/send",
            &token,
            json!({ "to": "parent@school.test", "key": "retired" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/communication/send",
            &token,
            json!({ "to": "parent@school.test", "key": "never-created", "subject": "Hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(app.notifier.sent().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_email_skips_repeated_addresses(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Registrar], None).await;

    let (status, report) = app
        .post(
            "/api/communication/send-bulk",
            &token,
            json!({
                "recipients": ["a@school.test", "b@school.test", "A@school.test"],
                "subject": "Half term",
                "text_body": "Classes resume on {date}.",
                "params": { "date": "2024-03-11" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["sent"], 2);
    assert_eq!(report["failed"], 0);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|e| e.text == "Classes resume on 2024-03-11."));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_to_parents_posts_a_general_announcement(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Headmaster], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 3C").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, student_id).await;

    let (status, report) = app
        .post(
            &format!("/api/communication/send-to-parents/{student_id}"),
            &token,
            json!({ "title": "Sports day", "message": "Sports day is on Friday." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["created"], 1);
    assert_eq!(report["emailed"], 1);

    let parent_token = app.login(&parent.email, TEST_PASSWORD).await;
    let (_, notifications) = app.get("/api/notifications", &parent_token).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["notification_type"], "general_announcement");
    assert_eq!(notifications[0]["title"], "Sports day");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, parent.email);

    let (status, _) = app
        .post(
            &format!("/api/communication/send-to-parents/{student_id}"),
            &token,
            json!({ "title": "Quiet notice", "message": "In-app only.", "send_email": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_to_parents_of_unknown_student(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Registrar], None).await;

    let (status, _) = app
        .post(
            &format!("/api/communication/send-to-parents/{}", uuid::Uuid::new_v4()),
            &token,
            json!({ "title": "Hello", "message": "Hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teachers_cannot_send_messages(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app.get("/api/communication/templates", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/communication/send",
            &token,
            json!({ "to": "parent@school.test", "subject": "Hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
