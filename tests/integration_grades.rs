mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_student};
use schoolbase_auth::Role;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

async fn create_assessment(app: &TestApp, token: &str, subject: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/exams/assessments",
            token,
            json!({
                "name": format!("{subject} mid-term"),
                "term": "2024-T1",
                "class_name": "Form 1A",
                "subject": subject
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn record_scores(app: &TestApp, token: &str, assessment: &Value, scores: &[(Uuid, f64)]) {
    let items: Vec<Value> = scores
        .iter()
        .map(|(student_id, score)| json!({ "student_id": student_id, "score": score }))
        .collect();
    let (status, body) = app
        .post(
            "/api/exams/results",
            token,
            json!({ "assessment_id": assessment["id"], "items": items }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], scores.len());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_report_average_and_pass_rate(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::DirectorOfStudies], None).await;
    let a = create_test_student(&pool, "Male", "Form 1A").await;
    let b = create_test_student(&pool, "Female", "Form 1A").await;
    let c = create_test_student(&pool, "Female", "Form 1A").await;

    let assessment = create_assessment(&app, &token, "Mathematics").await;
    record_scores(&app, &token, &assessment, &[(a, 40.0), (b, 60.0), (c, 80.0)]).await;

    let (status, report) = app
        .get("/api/grades/class-report?term=2024-T1&class_name=Form%201A", &token)
        .await;

    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["overall_average"], 60.0);
    assert_eq!(report["overall_pass_rate"], 66.7);
    assert_eq!(report["subjects"][0]["subject"], "Mathematics");
    assert_eq!(report["subjects"][0]["count"], 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rescoring_replaces_previous_result(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Headmaster], None).await;
    let student = create_test_student(&pool, "Male", "Form 1A").await;

    let assessment = create_assessment(&app, &token, "English").await;
    record_scores(&app, &token, &assessment, &[(student, 30.0)]).await;
    record_scores(&app, &token, &assessment, &[(student, 75.0)]).await;

    let uri = format!("/api/exams/assessments/{}/results", assessment["id"].as_str().unwrap());
    let (status, results) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    let items = results["items"].as_array().unwrap();
    let row = items.iter().find(|r| r["student_id"] == json!(student)).unwrap();
    assert_eq!(row["score"], 75.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unassigned_teacher_cannot_create_assessment(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app
        .post(
            "/api/exams/assessments",
            &token,
            json!({ "name": "Quiz", "class_name": "Form 1A", "subject": "Biology" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_report_card_is_scoped_to_linked_student(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let staff = app.token_for(&[Role::Headmaster], None).await;
    let own = create_test_student(&pool, "Female", "Form 1A").await;
    let other = create_test_student(&pool, "Male", "Form 1A").await;

    let assessment = create_assessment(&app, &staff, "Mathematics").await;
    record_scores(&app, &staff, &assessment, &[(own, 72.0), (other, 35.0)]).await;

    let student = app.token_for(&[Role::Student], Some(own)).await;
    let (status, card) = app
        .get(&format!("/api/grades/my/report-card?student_id={other}"), &student)
        .await;

    assert_eq!(status, StatusCode::OK, "{card}");
    assert_eq!(card["student_id"], json!(own));
    assert_eq!(card["overall_average"], 72.0);
    assert_eq!(card["lines"][0]["passed"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_without_link_is_forbidden(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let student = app.token_for(&[Role::Student], None).await;

    let (status, body) = app.get("/api/grades/my/report-card", &student).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Student link not configured");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_staff_cannot_use_student_portal(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let teacher = app.token_for(&[Role::Teacher], None).await;

    let (status, _) = app.get("/api/grades/my", &teacher).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
