use axum::{Json, extract::State};
use tracing::instrument;

use schoolbase_core::AppError;

use super::model::{SchoolSettings, UpdateSettingsDto, Versioned};
use crate::middleware::auth::{RequireSettingsWrite, RequireStaff};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings and their version", body = Versioned<SchoolSettings>),
        (status = 403, description = "Staff only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    _guard: RequireStaff,
) -> Result<Json<Versioned<SchoolSettings>>, AppError> {
    Ok(Json(state.settings.current().await?))
}

/// Apply a partial update against the version the caller last read
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = UpdateSettingsDto,
    responses(
        (status = 200, description = "Settings updated", body = Versioned<SchoolSettings>),
        (status = 409, description = "Stale version", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
#[instrument(skip(state, dto), fields(version = dto.version))]
pub async fn update_settings(
    State(state): State<AppState>,
    _guard: RequireSettingsWrite,
    ValidatedJson(dto): ValidatedJson<UpdateSettingsDto>,
) -> Result<Json<Versioned<SchoolSettings>>, AppError> {
    Ok(Json(state.settings.update(dto.version, &dto.patch).await?))
}
