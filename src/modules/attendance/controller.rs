use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::StudentId;

use super::model::{
    Attendance, AttendanceSheet, AttendanceSheetParams, DateRangeParams, MarkAttendanceDto,
    MarkAttendanceResponse, StreakSummary,
};
use super::service::AttendanceService;
use crate::middleware::auth::{RequireAttendance, RequireStudent};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Class roster for a day with any recorded marks
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceSheetParams),
    responses(
        (status = 200, description = "Attendance sheet", body = AttendanceSheet),
        (status = 400, description = "Missing or malformed date", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state))]
pub async fn get_sheet(
    State(state): State<AppState>,
    _guard: RequireAttendance,
    Query(params): Query<AttendanceSheetParams>,
) -> Result<Json<AttendanceSheet>, AppError> {
    Ok(Json(AttendanceService::get_sheet(&state.db, params).await?))
}

/// Record marks for a day; re-marking a student overwrites
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendanceDto,
    responses(
        (status = 200, description = "Marks saved", body = MarkAttendanceResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state, dto))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    _guard: RequireAttendance,
    ValidatedJson(dto): ValidatedJson<MarkAttendanceDto>,
) -> Result<Json<MarkAttendanceResponse>, AppError> {
    let response = AttendanceService::mark_attendance(&state.db, &*state.notifier, dto).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/attendance/my",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Own attendance, newest first", body = Vec<Attendance>),
        (status = 403, description = "No linked student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state))]
pub async fn my_attendance(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(range): Query<DateRangeParams>,
) -> Result<Json<Vec<Attendance>>, AppError> {
    let student_id = StudentService::resolve_self(&state.db, &auth_user, None).await?;
    Ok(Json(AttendanceService::student_history(&state.db, student_id, range).await?))
}

/// Runs of consecutive identical marks
#[utoipa::path(
    get,
    path = "/api/attendance/students/{id}/streaks",
    params(("id" = uuid::Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Attendance streaks", body = StreakSummary),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state))]
pub async fn get_streaks(
    State(state): State<AppState>,
    _guard: RequireAttendance,
    Path(id): Path<StudentId>,
) -> Result<Json<StreakSummary>, AppError> {
    Ok(Json(AttendanceService::streaks(&state.db, id).await?))
}
