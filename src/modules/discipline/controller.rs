use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{CaseId, UserId};

use super::model::{
    CaseFilterParams, CaseWithStudent, CreateCaseDto, DisciplinaryCase, DisciplineSummary,
    UpdateCaseDto, cases_csv,
};
use super::service::DisciplineService;
use crate::export::csv_attachment;
use crate::middleware::auth::{RequireDiscipline, RequireDisciplineWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Record a disciplinary case
///
/// Patrons may only record cases for male students and Matrons for female students.
#[utoipa::path(
    post,
    path = "/api/discipline/cases",
    request_body = CreateCaseDto,
    responses(
        (status = 201, description = "Case recorded", body = DisciplinaryCase),
        (status = 403, description = "Student outside the caller's gender scope", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state, dto))]
pub async fn create_case(
    State(state): State<AppState>,
    RequireDisciplineWrite(auth_user): RequireDisciplineWrite,
    ValidatedJson(dto): ValidatedJson<CreateCaseDto>,
) -> Result<(StatusCode, Json<DisciplinaryCase>), AppError> {
    let created_by = UserId::from(auth_user.user_id()?);
    let case = DisciplineService::create_case(
        &state.db,
        &*state.notifier,
        &auth_user.roles(),
        created_by,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(case)))
}

#[utoipa::path(
    get,
    path = "/api/discipline/cases",
    params(CaseFilterParams),
    responses(
        (status = 200, description = "Cases, newest first", body = Vec<CaseWithStudent>)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state))]
pub async fn list_cases(
    State(state): State<AppState>,
    RequireDiscipline(auth_user): RequireDiscipline,
    Query(filters): Query<CaseFilterParams>,
) -> Result<Json<Vec<CaseWithStudent>>, AppError> {
    Ok(Json(
        DisciplineService::list_cases(&state.db, &auth_user.roles(), &filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/discipline/cases/{id}",
    params(("id" = uuid::Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case", body = CaseWithStudent),
        (status = 403, description = "Student outside the caller's gender scope", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state))]
pub async fn get_case(
    State(state): State<AppState>,
    RequireDiscipline(auth_user): RequireDiscipline,
    Path(id): Path<CaseId>,
) -> Result<Json<CaseWithStudent>, AppError> {
    Ok(Json(
        DisciplineService::get_case(&state.db, &auth_user.roles(), id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/discipline/cases/{id}",
    params(("id" = uuid::Uuid, Path, description = "Case ID")),
    request_body = UpdateCaseDto,
    responses(
        (status = 200, description = "Case updated", body = DisciplinaryCase),
        (status = 403, description = "Student outside the caller's gender scope", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state, dto))]
pub async fn update_case(
    State(state): State<AppState>,
    RequireDisciplineWrite(auth_user): RequireDisciplineWrite,
    Path(id): Path<CaseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCaseDto>,
) -> Result<Json<DisciplinaryCase>, AppError> {
    let case = DisciplineService::update_case(
        &state.db,
        &*state.notifier,
        &auth_user.roles(),
        id,
        dto,
    )
    .await?;
    Ok(Json(case))
}

#[utoipa::path(
    delete,
    path = "/api/discipline/cases/{id}",
    params(("id" = uuid::Uuid, Path, description = "Case ID")),
    responses(
        (status = 204, description = "Case deleted"),
        (status = 403, description = "Student outside the caller's gender scope", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state))]
pub async fn delete_case(
    State(state): State<AppState>,
    RequireDisciplineWrite(auth_user): RequireDisciplineWrite,
    Path(id): Path<CaseId>,
) -> Result<StatusCode, AppError> {
    DisciplineService::delete_case(&state.db, &auth_user.roles(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/discipline/summary",
    params(CaseFilterParams),
    responses(
        (status = 200, description = "Case totals", body = DisciplineSummary)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    RequireDiscipline(auth_user): RequireDiscipline,
    Query(filters): Query<CaseFilterParams>,
) -> Result<Json<DisciplineSummary>, AppError> {
    Ok(Json(
        DisciplineService::summary(&state.db, &auth_user.roles(), &filters).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/discipline/export",
    params(CaseFilterParams),
    responses(
        (status = 200, description = "Cases as CSV", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "Discipline"
)]
#[instrument(skip(state))]
pub async fn export_cases(
    State(state): State<AppState>,
    RequireDiscipline(auth_user): RequireDiscipline,
    Query(filters): Query<CaseFilterParams>,
) -> Result<Response, AppError> {
    let cases = DisciplineService::cases_for_export(&state.db, &auth_user.roles(), &filters).await?;
    let filename = format!("disciplinary_cases_{}.csv", Utc::now().date_naive());
    Ok(csv_attachment(&filename, cases_csv(&cases)))
}
