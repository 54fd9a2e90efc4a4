use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{AssignmentId, TeacherId};

use super::model::{
    AssignmentFilterParams, CreateAssignmentDto, CreateTeacherDto, Teacher, TeacherAssignment,
    TeacherFilterParams, UpdateTeacherDto,
};
use super::service::TeacherService;
use crate::middleware::auth::RequireTeachers;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherFilterParams),
    responses(
        (status = 200, description = "Teachers", body = Vec<Teacher>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn get_teachers(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Query(filters): Query<TeacherFilterParams>,
) -> Result<Json<Vec<Teacher>>, AppError> {
    Ok(Json(TeacherService::list_teachers(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher created", body = Teacher),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, dto))]
pub async fn create_teacher(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = TeacherService::create_teacher(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Path(id): Path<TeacherId>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::get_teacher(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Teacher ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, dto))]
pub async fn update_teacher(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Path(id): Path<TeacherId>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherDto>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::update_teacher(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 204, description = "Teacher and assignments deleted"),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Path(id): Path<TeacherId>,
) -> Result<StatusCode, AppError> {
    TeacherService::delete_teacher(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/teachers/assignments",
    params(AssignmentFilterParams),
    responses(
        (status = 200, description = "Teacher assignments", body = Vec<TeacherAssignment>)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn list_assignments(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Query(filters): Query<AssignmentFilterParams>,
) -> Result<Json<Vec<TeacherAssignment>>, AppError> {
    Ok(Json(TeacherService::list_assignments(&state.db, filters).await?))
}

/// Assign a teacher to a class and subject
#[utoipa::path(
    post,
    path = "/api/teachers/assignments",
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = TeacherAssignment),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Assignment already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, dto))]
pub async fn create_assignment(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<TeacherAssignment>), AppError> {
    let assignment = TeacherService::create_assignment(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/assignments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    _guard: RequireTeachers,
    Path(id): Path<AssignmentId>,
) -> Result<StatusCode, AppError> {
    TeacherService::delete_assignment(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
