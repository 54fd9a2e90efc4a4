mod common;

use axum::http::StatusCode;
use common::TestApp;
use schoolbase_auth::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_settings_update_bumps_version(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Headmaster], None).await;

    let (status, current) = app.get("/api/settings", &token).await;
    assert_eq!(status, StatusCode::OK);
    let version = current["version"].as_i64().unwrap();

    let (status, updated) = app
        .put(
            "/api/settings",
            &token,
            json!({ "version": version, "school_name": "Lakeside High" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["version"], version + 1);
    assert_eq!(updated["value"]["school_name"], "Lakeside High");
    assert_eq!(updated["value"]["currency"], current["value"]["currency"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_settings_version_conflicts(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::ItSupport], None).await;

    let (status, _) = app
        .put("/api/settings", &token, json!({ "version": 0, "currency": "usd" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .put("/api/settings", &token, json!({ "version": 0, "currency": "eur" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, current) = app.get("/api/settings", &token).await;
    assert_eq!(current["version"], 1);
    assert_eq!(current["value"]["currency"], "USD");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_settings_are_staff_readable_but_not_writable(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Accountant], None).await;

    let (status, _) = app.get("/api/settings", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .put("/api/settings", &token, json!({ "version": 0, "school_name": "Nope" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parents_cannot_read_settings(pool: PgPool) {
    let app = TestApp::new(pool);
    let token = app.token_for(&[Role::Parent], None).await;

    let (status, _) = app.get("/api/settings", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
