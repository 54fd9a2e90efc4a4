mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_student};
use schoolbase_auth::Role;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_invoice(app: &TestApp, token: &str, student_id: uuid::Uuid, amount: f64) -> Value {
    let (status, body) = app
        .post(
            "/api/fees/invoices",
            token,
            json!({
                "student_id": student_id,
                "term": "2024-T1",
                "amount": amount,
                "due_date": "2030-01-31"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[sqlx::test(migrations = "./migrations")]
async fn test_new_invoice_is_unpaid_with_full_balance(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 1A").await;

    let invoice = create_invoice(&app, &token, student_id, 100.0).await;

    assert_eq!(invoice["status"], "unpaid");
    assert_eq!(invoice["balance"], 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_payments_reduce_balance(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 1A").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;

    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            &token,
            json!({ "invoice_id": invoice["id"], "amount": 30.0, "method": "Cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["invoice"]["balance"], 70.0);
    assert_eq!(receipt["invoice"]["status"], "partial");

    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            &token,
            json!({ "invoice_id": invoice["id"], "amount": 20.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["invoice"]["balance"], 50.0);
    assert_eq!(receipt["invoice"]["status"], "partial");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payment_in_full_marks_invoice_paid(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 1A").await;
    let invoice = create_invoice(&app, &token, student_id, 80.0).await;

    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            &token,
            json!({ "invoice_id": invoice["id"], "amount": 80.0 }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["invoice"]["balance"], 0.0);
    assert_eq!(receipt["invoice"]["status"], "paid");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_overpayment_clamps_balance_to_zero(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 1A").await;
    let invoice = create_invoice(&app, &token, student_id, 50.0).await;

    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            &token,
            json!({ "invoice_id": invoice["id"], "amount": 75.0 }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["invoice"]["balance"], 0.0);
    assert_eq!(receipt["invoice"]["status"], "paid");
    assert_eq!(receipt["payment"]["amount"], 75.0);
    assert_eq!(receipt["payment"]["applied_amount"], 50.0);

    let (_, invoice) = app
        .get(&format!("/api/fees/invoices/{}", invoice["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(invoice["balance"], 0.0);
    assert_eq!(invoice["status"], "paid");
}

async fn pay(app: &TestApp, token: &str, invoice_id: &Value, amount: f64) -> Value {
    let (status, receipt) = app
        .post(
            "/api/fees/payments",
            token,
            json!({ "invoice_id": invoice_id, "amount": amount }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    receipt
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reversing_a_payment_restores_its_debit_once(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 3C").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;

    let receipt = pay(&app, &token, &invoice["id"], 40.0).await;
    let payment_id = receipt["payment"]["id"].as_str().unwrap().to_string();
    assert_eq!(receipt["invoice"]["balance"], 60.0);

    let uri = format!("/api/fees/payments/{payment_id}/status");
    let (status, body) = app.put(&uri, &token, json!({ "status": "reversed" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payment"]["status"], "reversed");
    assert_eq!(body["invoice"]["balance"], 100.0);
    assert_eq!(body["invoice"]["status"], "unpaid");

    let (status, _) = app.put(&uri, &token, json!({ "status": "refunded" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, invoice) = app
        .get(&format!("/api/fees/invoices/{}", invoice["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(invoice["balance"], 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refunding_an_overpayment_restores_only_what_it_covered(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 3C").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;

    pay(&app, &token, &invoice["id"], 70.0).await;
    let receipt = pay(&app, &token, &invoice["id"], 50.0).await;
    assert_eq!(receipt["invoice"]["balance"], 0.0);
    assert_eq!(receipt["payment"]["applied_amount"], 30.0);

    let payment_id = receipt["payment"]["id"].as_str().unwrap();
    let (status, body) = app
        .put(
            &format!("/api/fees/payments/{payment_id}/status"),
            &token,
            json!({ "status": "refunded" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["invoice"]["balance"], 30.0);
    assert_eq!(body["invoice"]["status"], "partial");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_waivers_reduce_the_named_invoice(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 2B").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;
    let invoice_id = invoice["id"].as_str().unwrap();

    let (status, flat) = app
        .post(
            "/api/fees/waivers",
            &token,
            json!({
                "student_id": student_id,
                "invoice_id": invoice_id,
                "waiver_type": "bursary",
                "amount": 20.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{flat}");
    assert_eq!(flat["applied_amount"], 20.0);
    assert_eq!(flat["status"], "approved");

    let (status, pct) = app
        .post(
            "/api/fees/waivers",
            &token,
            json!({
                "student_id": student_id,
                "invoice_id": invoice_id,
                "waiver_type": "sibling",
                "percentage": 50.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{pct}");
    assert_eq!(pct["applied_amount"], 40.0);

    let (_, invoice) = app.get(&format!("/api/fees/invoices/{invoice_id}"), &token).await;
    assert_eq!(invoice["balance"], 40.0);
    assert_eq!(invoice["status"], "partial");

    let (_, listed) = app
        .get(&format!("/api/fees/waivers?student_id={student_id}"), &token)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_waiver_without_invoice_moves_no_balance(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Male", "Form 2B").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;

    let (status, waiver) = app
        .post(
            "/api/fees/waivers",
            &token,
            json!({ "student_id": student_id, "waiver_type": "scholarship", "percentage": 25.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{waiver}");
    assert_eq!(waiver["applied_amount"], 0.0);
    assert!(waiver["invoice_id"].is_null());

    let (_, invoice) = app
        .get(&format!("/api/fees/invoices/{}", invoice["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(invoice["balance"], 100.0);

    let (status, _) = app
        .post(
            "/api/fees/waivers",
            &token,
            json!({ "student_id": student_id, "waiver_type": "scholarship" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_waiver_rejects_another_students_invoice(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let owner = create_test_student(&pool, "Male", "Form 2B").await;
    let other = create_test_student(&pool, "Male", "Form 2B").await;
    let invoice = create_invoice(&app, &token, owner, 100.0).await;

    let (status, _) = app
        .post(
            "/api/fees/waivers",
            &token,
            json!({
                "student_id": other,
                "invoice_id": invoice["id"],
                "waiver_type": "bursary",
                "amount": 10.0
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invoice_with_payments_cannot_be_deleted(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 2B").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;
    let invoice_id = invoice["id"].as_str().unwrap();

    app.post(
        "/api/fees/payments",
        &token,
        json!({ "invoice_id": invoice_id, "amount": 10.0 }),
    )
    .await;

    let (status, body) = app.delete(&format!("/api/fees/invoices/{invoice_id}"), &token).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("payment"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unpaid_invoice_can_be_deleted(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Accountant], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 2B").await;
    let invoice = create_invoice(&app, &token, student_id, 100.0).await;
    let invoice_id = invoice["id"].as_str().unwrap();

    let (status, _) = app.delete(&format!("/api/fees/invoices/{invoice_id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/fees/invoices/{invoice_id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_headmaster_has_read_only_accounting(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Headmaster], None).await;
    let student_id = create_test_student(&pool, "Female", "Form 1A").await;

    let (status, _) = app.get("/api/fees/invoices", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/fees/invoices",
            &token,
            json!({ "student_id": student_id, "term": "2024-T1", "amount": 100.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Read-only role");

    let (status, _) = app
        .post(
            "/api/accounting/expenses",
            &token,
            json!({ "date": "2024-02-01", "category": "utilities", "amount": 40.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_see_invoices(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app.get("/api/fees/invoices", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_sees_only_own_fees(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let accountant = app.token_for(&[Role::Accountant], None).await;
    let own = create_test_student(&pool, "Male", "Form 1A").await;
    let other = create_test_student(&pool, "Male", "Form 1A").await;
    create_invoice(&app, &accountant, own, 100.0).await;
    create_invoice(&app, &accountant, other, 250.0).await;

    let student = app.token_for(&[Role::Student], Some(own)).await;
    let (status, body) = app.get("/api/fees/my", &student).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_due"], 100.0);
}
