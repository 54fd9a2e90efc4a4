#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use schoolbase::notifier::RecordingNotifier;
use schoolbase::router::init_router;
use schoolbase::settings_store::InMemorySettingsStore;
use schoolbase::state::AppState;
use schoolbase_auth::Role;
use schoolbase_config::{CorsConfig, EmailConfig, JobsConfig, JwtConfig};
use schoolbase_core::hash_password;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new(pool: PgPool) -> Self {
        dotenvy::dotenv().ok();
        let notifier = Arc::new(RecordingNotifier::new());
        let state = AppState {
            db: pool,
            jwt_config: JwtConfig::from_env(),
            email_config: EmailConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            jobs_config: JobsConfig::default(),
            settings: Arc::new(InMemorySettingsStore::default()),
            notifier: notifier.clone(),
        };
        Self { state, notifier }
    }

    pub fn router(&self) -> Router {
        init_router(self.state.clone())
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("DELETE", uri, Some(token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Creates an account with `roles` and returns its bearer token.
    pub async fn token_for(&self, roles: &[Role], student_id: Option<Uuid>) -> String {
        let user = create_test_user(&self.state.db, roles, student_id).await;
        self.login(&user.email, TEST_PASSWORD).await
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_test_user(pool: &PgPool, roles: &[Role], student_id: Option<Uuid>) -> TestUser {
    let email = generate_unique_email();
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, full_name, hashed_password, student_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&email)
    .bind("Test User")
    .bind(&hashed)
    .bind(student_id)
    .fetch_one(pool)
    .await
    .unwrap();

    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(role.as_str())
            .execute(pool)
            .await
            .unwrap();
    }

    TestUser { id, email }
}

pub async fn create_test_student(pool: &PgPool, gender: &str, class_name: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO students (admission_no, first_name, last_name, gender, class_name)
        VALUES ($1, 'Test', 'Student', $2, $3)
        RETURNING id
        "#,
    )
    .bind(format!("ADM-{}", Uuid::new_v4()))
    .bind(gender)
    .bind(class_name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn link_guardian(pool: &PgPool, parent_id: Uuid, student_id: Uuid) {
    sqlx::query("INSERT INTO guardian_links (parent_user_id, student_id) VALUES ($1, $2)")
        .bind(parent_id)
        .bind(student_id)
        .execute(pool)
        .await
        .unwrap();
}
