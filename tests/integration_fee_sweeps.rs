mod common;

use axum::http::StatusCode;
use chrono::{Duration, NaiveDate, Utc};
use common::{TestApp, create_test_student, create_test_user, link_guardian};
use schoolbase_auth::Role;
use serde_json::{Value, json};
use sqlx::PgPool;

fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

async fn create_invoice(
    app: &TestApp,
    token: &str,
    student_id: uuid::Uuid,
    amount: f64,
    late_fee: f64,
    due_date: NaiveDate,
) -> Value {
    let (status, body) = app
        .post(
            "/api/fees/invoices",
            token,
            json!({
                "student_id": student_id,
                "term": "2024-T2",
                "amount": amount,
                "late_fee": late_fee,
                "due_date": due_date
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[sqlx::test(migrations = "./migrations")]
async fn test_overdue_sweep_marks_each_late_invoice_once(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 1A").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, student_id).await;

    let late = create_invoice(&app, &token, student_id, 100.0, 10.0, days_from_today(-5)).await;
    let current = create_invoice(&app, &token, student_id, 100.0, 10.0, days_from_today(7)).await;

    let (status, report) = app.post("/api/fees/sweeps/overdue", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["processed"], 1);
    assert_eq!(report["failed"], 0);

    let (_, late) = app
        .get(&format!("/api/fees/invoices/{}", late["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(late["status"], "overdue");
    assert_eq!(late["balance"], 100.0);
    assert_eq!(late["total_due"], 110.0);

    let (_, current) = app
        .get(&format!("/api/fees/invoices/{}", current["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(current["status"], "unpaid");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, parent.email);
    assert!(sent[0].text.contains("KES 110.00"), "{}", sent[0].text);
    assert!(sent[0].text.contains("5 days overdue"), "{}", sent[0].text);

    let (status, report) = app.post("/api/fees/sweeps/overdue", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 0);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payment_on_overdue_invoice_rederives_status(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 1A").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0, 0.0, days_from_today(-2)).await;

    app.post("/api/fees/sweeps/overdue", &token, json!({})).await;

    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            &token,
            json!({ "invoice_id": invoice["id"], "amount": 25.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["invoice"]["status"], "partial");

    let (_, report) = app.post("/api/fees/sweeps/overdue", &token, json!({})).await;
    assert_eq!(report["processed"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reminder_sweep_targets_exactly_n_days_ahead(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 4D").await;
    let parent = create_test_user(&pool, &[Role::Parent], None).await;
    link_guardian(&pool, parent.id, student_id).await;

    // Settings default to three days ahead.
    create_invoice(&app, &token, student_id, 80.0, 0.0, days_from_today(3)).await;
    create_invoice(&app, &token, student_id, 80.0, 0.0, days_from_today(2)).await;
    create_invoice(&app, &token, student_id, 80.0, 0.0, days_from_today(4)).await;

    let (status, report) = app.post("/api/fees/sweeps/reminders", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["processed"], 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.starts_with("Fee Payment Reminder"));
    assert!(sent[0].text.contains(&days_from_today(3).to_string()), "{}", sent[0].text);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reminder_skips_settled_invoices(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 4D").await;
    let invoice = create_invoice(&app, &token, student_id, 60.0, 0.0, days_from_today(3)).await;

    app.post(
        "/api/fees/payments",
        &token,
        json!({ "invoice_id": invoice["id"], "amount": 60.0 }),
    )
    .await;

    let (_, report) = app.post("/api/fees/sweeps/reminders", &token, json!({})).await;
    assert_eq!(report["processed"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sweeps_need_write_access(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Headmaster], None).await;

    let (status, body) = app.post("/api/fees/sweeps/overdue", &token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Read-only role");

    let (status, _) = app.post("/api/fees/sweeps/reminders", &token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
