use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::ApplicationId;

use super::model::{
    Application, ApplicationFilterParams, ApplicationStatusView, ApprovalOutcome,
    ApproveApplicationDto, CreateApplicationDto, RejectApplicationDto,
};
use super::service::ApplicationService;
use crate::middleware::auth::RequireAdmissions;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Submit an admission application (no login required)
#[utoipa::path(
    post,
    path = "/api/public/applications",
    request_body = CreateApplicationDto,
    responses(
        (status = 201, description = "Application received", body = Application),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Admissions"
)]
#[instrument(skip(state, dto))]
pub async fn submit_application(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateApplicationDto>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = ApplicationService::submit_application(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// Check an application by its reference
#[utoipa::path(
    get,
    path = "/api/public/applications/{reference}",
    params(("reference" = String, Path, description = "Reference, e.g. APP-20240109-7KQ2ZD")),
    responses(
        (status = 200, description = "Application status", body = ApplicationStatusView),
        (status = 404, description = "Unknown reference", body = ErrorResponse)
    ),
    tag = "Admissions"
)]
#[instrument(skip(state))]
pub async fn get_application_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ApplicationStatusView>, AppError> {
    Ok(Json(ApplicationService::get_status(&state.db, &reference).await?))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(ApplicationFilterParams),
    responses(
        (status = 200, description = "Applications, newest first", body = Vec<Application>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admissions"
)]
#[instrument(skip(state))]
pub async fn list_applications(
    State(state): State<AppState>,
    _guard: RequireAdmissions,
    Query(filters): Query<ApplicationFilterParams>,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(ApplicationService::list_applications(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(("id" = uuid::Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application", body = Application),
        (status = 404, description = "Application not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admissions"
)]
#[instrument(skip(state))]
pub async fn get_application(
    State(state): State<AppState>,
    _guard: RequireAdmissions,
    Path(id): Path<ApplicationId>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(ApplicationService::get_application(&state.db, id).await?))
}

/// Approve a pending application and create the student
#[utoipa::path(
    post,
    path = "/api/applications/{id}/approve",
    params(("id" = uuid::Uuid, Path, description = "Application ID")),
    request_body = ApproveApplicationDto,
    responses(
        (status = 200, description = "Application approved", body = ApprovalOutcome),
        (status = 404, description = "Application not found", body = ErrorResponse),
        (status = 409, description = "Already processed or admission number in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admissions"
)]
#[instrument(skip(state, dto))]
pub async fn approve_application(
    State(state): State<AppState>,
    _guard: RequireAdmissions,
    Path(id): Path<ApplicationId>,
    ValidatedJson(dto): ValidatedJson<ApproveApplicationDto>,
) -> Result<Json<ApprovalOutcome>, AppError> {
    Ok(Json(ApplicationService::approve_application(&state.db, id, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/reject",
    params(("id" = uuid::Uuid, Path, description = "Application ID")),
    request_body = RejectApplicationDto,
    responses(
        (status = 200, description = "Application rejected", body = Application),
        (status = 404, description = "Application not found", body = ErrorResponse),
        (status = 409, description = "Already processed", body = ErrorResponse),
        (status = 422, description = "Reason is required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admissions"
)]
#[instrument(skip(state, dto))]
pub async fn reject_application(
    State(state): State<AppState>,
    _guard: RequireAdmissions,
    Path(id): Path<ApplicationId>,
    ValidatedJson(dto): ValidatedJson<RejectApplicationDto>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(ApplicationService::reject_application(&state.db, id, dto).await?))
}
