use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::StudentId;

use super::model::{
    ClassReport, ClassReportParams, GradeList, MyGradesParams, ProgressPoint, ReportCard,
    ReportCardParams, TermParams, class_report_csv,
};
use super::service::GradeService;
use crate::export::csv_attachment;
use crate::middleware::auth::{RequireExams, RequireStudent};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::service::StudentService;
use crate::state::AppState;

/// Averages and pass rates overall and per subject
#[utoipa::path(
    get,
    path = "/api/grades/class-report",
    params(ClassReportParams),
    responses(
        (status = 200, description = "Class report", body = ClassReport),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn get_class_report(
    State(state): State<AppState>,
    _guard: RequireExams,
    Query(params): Query<ClassReportParams>,
) -> Result<Json<ClassReport>, AppError> {
    Ok(Json(GradeService::class_report(&state.db, params).await?))
}

#[utoipa::path(
    get,
    path = "/api/grades/class-report/csv",
    params(ClassReportParams),
    responses(
        (status = 200, description = "Class report as CSV", content_type = "text/csv", body = String),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn get_class_report_csv(
    State(state): State<AppState>,
    _guard: RequireExams,
    Query(params): Query<ClassReportParams>,
) -> Result<Response, AppError> {
    let report = GradeService::class_report(&state.db, params).await?;
    let filename = format!(
        "class_report_{}.csv",
        report.class_name.as_deref().unwrap_or("all")
    );
    Ok(csv_attachment(&filename, class_report_csv(&report)))
}

/// Own results, ordered by assessment date
#[utoipa::path(
    get,
    path = "/api/grades/my",
    params(MyGradesParams),
    responses(
        (status = 200, description = "Own grades", body = GradeList),
        (status = 403, description = "No linked student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn my_grades(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(params): Query<MyGradesParams>,
) -> Result<Json<GradeList>, AppError> {
    let student_id = StudentService::resolve_self(&state.db, &auth_user, None).await?;
    Ok(Json(GradeService::my_grades(&state.db, student_id, params).await?))
}

/// Average per term
#[utoipa::path(
    get,
    path = "/api/grades/my/progress",
    responses(
        (status = 200, description = "Progress by term", body = Vec<ProgressPoint>),
        (status = 403, description = "No linked student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn my_progress(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Vec<ProgressPoint>>, AppError> {
    let student_id = StudentService::resolve_self(&state.db, &auth_user, None).await?;
    Ok(Json(GradeService::progress(&state.db, student_id).await?))
}

/// Own report card; any `student_id` supplied is ignored
#[utoipa::path(
    get,
    path = "/api/grades/my/report-card",
    params(ReportCardParams),
    responses(
        (status = 200, description = "Report card", body = ReportCard),
        (status = 403, description = "No linked student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn my_report_card(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(params): Query<ReportCardParams>,
) -> Result<Json<ReportCard>, AppError> {
    let student_id =
        StudentService::resolve_self(&state.db, &auth_user, params.student_id).await?;
    Ok(Json(GradeService::report_card(&state.db, student_id, params.term).await?))
}

#[utoipa::path(
    get,
    path = "/api/grades/report-cards/classes/{class_name}/csv",
    params(
        ("class_name" = String, Path, description = "Class name"),
        TermParams
    ),
    responses(
        (status = 200, description = "Per-result CSV for the class", content_type = "text/csv", body = String),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn class_report_cards_csv(
    State(state): State<AppState>,
    _guard: RequireExams,
    Path(class_name): Path<String>,
    Query(params): Query<TermParams>,
) -> Result<Response, AppError> {
    let results =
        GradeService::class_results_for_export(&state.db, &class_name, params.term).await?;
    Ok(csv_attachment(
        &format!("report_cards_{class_name}.csv"),
        super::model::class_report_cards_csv(&results),
    ))
}

#[utoipa::path(
    get,
    path = "/api/grades/report-cards/students/{id}/csv",
    params(
        ("id" = uuid::Uuid, Path, description = "Student ID"),
        TermParams
    ),
    responses(
        (status = 200, description = "Per-result CSV for the student", content_type = "text/csv", body = String),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Grades"
)]
#[instrument(skip(state))]
pub async fn student_report_card_csv(
    State(state): State<AppState>,
    _guard: RequireExams,
    Path(id): Path<StudentId>,
    Query(params): Query<TermParams>,
) -> Result<Response, AppError> {
    let results = GradeService::student_results_for_export(&state.db, id, params.term).await?;
    Ok(csv_attachment(
        &format!("report_card_{id}.csv"),
        super::model::student_report_card_csv(&results),
    ))
}
