use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::require_admin;
use crate::modules::accounting::init_accounting_router;
use crate::modules::applications::{init_applications_router, init_public_applications_router};
use crate::modules::attendance::init_attendance_router;
use crate::modules::auth::init_auth_router;
use crate::modules::communication::init_communication_router;
use crate::modules::discipline::init_discipline_router;
use crate::modules::exams::init_exams_router;
use crate::modules::fees::init_fees_router;
use crate::modules::grades::init_grades_router;
use crate::modules::notifications::init_notifications_router;
use crate::modules::settings::init_settings_router;
use crate::modules::students::init_students_router;
use crate::modules::teachers::init_teachers_router;
use crate::modules::timetable::init_timetable_router;
use crate::modules::users::init_users_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

/// Everything under `/api`. Per-route role checks live in the handlers'
/// guard extractors; only the users router is gated as a whole.
pub fn api_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", init_auth_router())
        .nest(
            "/users",
            init_users_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .nest("/students", init_students_router())
        .nest("/public/applications", init_public_applications_router())
        .nest("/applications", init_applications_router())
        .nest("/attendance", init_attendance_router())
        .nest("/teachers", init_teachers_router())
        .nest("/exams", init_exams_router())
        .nest("/grades", init_grades_router())
        .nest("/fees", init_fees_router())
        .nest("/accounting", init_accounting_router())
        .nest("/timetable", init_timetable_router())
        .nest("/discipline", init_discipline_router())
        .nest("/notifications", init_notifications_router())
        .nest("/communication", init_communication_router())
        .nest("/settings", init_settings_router())
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", api_router(&state))
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
