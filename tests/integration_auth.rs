mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, TestApp, create_test_user};
use schoolbase_auth::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_returns_token_and_roles(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let user = create_test_user(&pool, &[Role::Accountant, Role::Teacher], None).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
    let roles = body["user"]["roles"].as_array().unwrap();
    assert!(roles.contains(&json!("Accountant")));
    assert!(roles.contains(&json!("Teacher")));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_with_wrong_password(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let user = create_test_user(&pool, &[Role::Teacher], None).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "not-the-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deactivated_account_cannot_login(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let user = create_test_user(&pool, &[Role::Teacher], None).await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_requires_token(pool: PgPool) {
    let app = TestApp::new(pool);
    let (status, _) = app.request("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_returns_current_user(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let token = app.token_for(&[Role::Registrar], None).await;

    let (status, body) = app.get("/api/auth/me", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!(["Registrar/Secretary"]));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_management_is_admin_only(pool: PgPool) {
    let app = TestApp::new(pool.clone());

    let teacher = app.token_for(&[Role::Teacher], None).await;
    let (status, _) = app.get("/api/users", &teacher).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token_for(&[Role::ItSupport], None).await;
    let (status, _) = app.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
}
