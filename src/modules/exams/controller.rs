use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::AssessmentId;

use super::model::{
    Assessment, AssessmentFilterParams, AssessmentResults, CreateAssessmentDto,
    UpdateAssessmentDto, UpsertResultsDto, UpsertResultsResponse,
};
use super::service::ExamService;
use crate::middleware::auth::RequireExams;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::teachers::service::TeacherService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// List assessments; teachers see only their assigned classes and subjects
#[utoipa::path(
    get,
    path = "/api/exams/assessments",
    params(AssessmentFilterParams),
    responses(
        (status = 200, description = "Assessments", body = Vec<Assessment>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state))]
pub async fn list_assessments(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    Query(filters): Query<AssessmentFilterParams>,
) -> Result<Json<Vec<Assessment>>, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    Ok(Json(ExamService::list_assessments(&state.db, &scope, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/exams/assessments",
    request_body = CreateAssessmentDto,
    responses(
        (status = 201, description = "Assessment created", body = Assessment),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 409, description = "Duplicate assessment", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state, dto))]
pub async fn create_assessment(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    ValidatedJson(dto): ValidatedJson<CreateAssessmentDto>,
) -> Result<(StatusCode, Json<Assessment>), AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    let assessment = ExamService::create_assessment(&state.db, &scope, dto).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

#[utoipa::path(
    get,
    path = "/api/exams/assessments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Assessment ID")),
    responses(
        (status = 200, description = "Assessment", body = Assessment),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state))]
pub async fn get_assessment(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    Path(id): Path<AssessmentId>,
) -> Result<Json<Assessment>, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    Ok(Json(ExamService::get_assessment(&state.db, &scope, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/exams/assessments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Assessment ID")),
    request_body = UpdateAssessmentDto,
    responses(
        (status = 200, description = "Assessment updated", body = Assessment),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state, dto))]
pub async fn update_assessment(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    Path(id): Path<AssessmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateAssessmentDto>,
) -> Result<Json<Assessment>, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    Ok(Json(ExamService::update_assessment(&state.db, &scope, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/exams/assessments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Assessment ID")),
    responses(
        (status = 204, description = "Assessment and its results deleted"),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state))]
pub async fn delete_assessment(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    Path(id): Path<AssessmentId>,
) -> Result<StatusCode, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    ExamService::delete_assessment(&state.db, &scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Class roster with recorded scores for one assessment
#[utoipa::path(
    get,
    path = "/api/exams/assessments/{id}/results",
    params(("id" = uuid::Uuid, Path, description = "Assessment ID")),
    responses(
        (status = 200, description = "Roster and scores", body = AssessmentResults),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state))]
pub async fn get_results(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    Path(id): Path<AssessmentId>,
) -> Result<Json<AssessmentResults>, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    Ok(Json(ExamService::get_results(&state.db, &scope, id).await?))
}

/// Record or overwrite scores; guardians are notified per score
#[utoipa::path(
    post,
    path = "/api/exams/results",
    request_body = UpsertResultsDto,
    responses(
        (status = 200, description = "Scores saved", body = UpsertResultsResponse),
        (status = 403, description = "Outside teaching assignment", body = ErrorResponse),
        (status = 404, description = "Assessment or student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Exams"
)]
#[instrument(skip(state, dto))]
pub async fn upsert_results(
    State(state): State<AppState>,
    RequireExams(auth_user): RequireExams,
    ValidatedJson(dto): ValidatedJson<UpsertResultsDto>,
) -> Result<Json<UpsertResultsResponse>, AppError> {
    let scope = TeacherService::teaching_scope(&state.db, &auth_user).await?;
    let response = ExamService::upsert_results(&state.db, &*state.notifier, &scope, dto).await?;
    Ok(Json(response))
}
