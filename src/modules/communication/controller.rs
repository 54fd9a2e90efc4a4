use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{CommTemplateId, StudentId};

use super::model::{
    AnnouncementDto, BulkEmailDto, CommTemplate, CreateTemplateDto, DeliveryReport, SendEmailDto,
    UpdateTemplateDto,
};
use super::service::CommunicationService;
use crate::middleware::auth::RequireCommunication;
use crate::modules::auth::controller::ErrorResponse;
use crate::notifier::DispatchReport;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/communication/templates",
    responses(
        (status = 200, description = "Templates ordered by key", body = Vec<CommTemplate>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state))]
pub async fn list_templates(
    State(state): State<AppState>,
    _guard: RequireCommunication,
) -> Result<Json<Vec<CommTemplate>>, AppError> {
    Ok(Json(CommunicationService::list_templates(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/communication/templates",
    request_body = CreateTemplateDto,
    responses(
        (status = 201, description = "Template created", body = CommTemplate),
        (status = 409, description = "Key already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state, dto))]
pub async fn create_template(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    ValidatedJson(dto): ValidatedJson<CreateTemplateDto>,
) -> Result<(StatusCode, Json<CommTemplate>), AppError> {
    let template = CommunicationService::create_template(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/communication/templates/{id}",
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template", body = CommTemplate),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    Path(id): Path<CommTemplateId>,
) -> Result<Json<CommTemplate>, AppError> {
    Ok(Json(CommunicationService::get_template(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/communication/templates/{id}",
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    request_body = UpdateTemplateDto,
    responses(
        (status = 200, description = "Template updated", body = CommTemplate),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 409, description = "Key already in use", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state, dto))]
pub async fn update_template(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    Path(id): Path<CommTemplateId>,
    ValidatedJson(dto): ValidatedJson<UpdateTemplateDto>,
) -> Result<Json<CommTemplate>, AppError> {
    Ok(Json(
        CommunicationService::update_template(&state.db, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/communication/templates/{id}",
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted, or already absent")
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state))]
pub async fn delete_template(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    Path(id): Path<CommTemplateId>,
) -> Result<StatusCode, AppError> {
    CommunicationService::delete_template(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send one email
///
/// Fields left out are taken from the template named by `key`, then
/// `{name}` placeholders are filled from `params`.
#[utoipa::path(
    post,
    path = "/api/communication/send",
    request_body = SendEmailDto,
    responses(
        (status = 200, description = "Delivery outcome", body = DeliveryReport),
        (status = 404, description = "Template not found or inactive", body = ErrorResponse),
        (status = 422, description = "Missing subject or invalid address", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state, dto))]
pub async fn send_email(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    ValidatedJson(dto): ValidatedJson<SendEmailDto>,
) -> Result<Json<DeliveryReport>, AppError> {
    Ok(Json(
        CommunicationService::send_email(&state.db, &*state.notifier, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/communication/send-bulk",
    request_body = BulkEmailDto,
    responses(
        (status = 200, description = "Delivery outcome", body = DeliveryReport),
        (status = 404, description = "Template not found or inactive", body = ErrorResponse),
        (status = 422, description = "Missing subject or invalid address", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state, dto))]
pub async fn send_bulk_email(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    ValidatedJson(dto): ValidatedJson<BulkEmailDto>,
) -> Result<Json<DeliveryReport>, AppError> {
    Ok(Json(
        CommunicationService::send_bulk(&state.db, &*state.notifier, dto).await?,
    ))
}

/// Announce to a student's guardians
///
/// Stores a general announcement for every linked guardian and emails those
/// whose preferences allow it.
#[utoipa::path(
    post,
    path = "/api/communication/send-to-parents/{student_id}",
    params(("student_id" = uuid::Uuid, Path, description = "Student ID")),
    request_body = AnnouncementDto,
    responses(
        (status = 200, description = "Fan-out outcome", body = DispatchReport),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Communication"
)]
#[instrument(skip(state, dto))]
pub async fn send_to_parents(
    State(state): State<AppState>,
    _guard: RequireCommunication,
    Path(student_id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<AnnouncementDto>,
) -> Result<Json<DispatchReport>, AppError> {
    Ok(Json(
        CommunicationService::announce_to_guardians(&state.db, &*state.notifier, student_id, dto)
            .await?,
    ))
}
