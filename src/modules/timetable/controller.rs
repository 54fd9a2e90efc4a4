use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{AllocationId, SlotId};

use super::model::{
    AllocationFilterParams, ConflictReport, CreateAllocationDto, CreateSlotDto, MyTimetable,
    SlotFilterParams, SubjectAllocation, TermParams, TimetableConfig, TimetableSlot,
    UpdateAllocationDto, UpdateSlotDto, UpsertConfigDto,
};
use super::service::TimetableService;
use crate::middleware::auth::{RequireStudent, RequireTimetable};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/timetable/config",
    params(TermParams),
    responses(
        (status = 200, description = "Timetable config", body = TimetableConfig),
        (status = 404, description = "No config for the term", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_config(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Query(params): Query<TermParams>,
) -> Result<Json<TimetableConfig>, AppError> {
    Ok(Json(TimetableService::get_config(&state.db, &params.term).await?))
}

/// Create or replace the config for a term
#[utoipa::path(
    put,
    path = "/api/timetable/config",
    request_body = UpsertConfigDto,
    responses(
        (status = 200, description = "Config saved", body = TimetableConfig),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn upsert_config(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    ValidatedJson(dto): ValidatedJson<UpsertConfigDto>,
) -> Result<Json<TimetableConfig>, AppError> {
    Ok(Json(TimetableService::upsert_config(&state.db, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/timetable/allocations",
    params(AllocationFilterParams),
    responses(
        (status = 200, description = "Allocations", body = Vec<SubjectAllocation>)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn list_allocations(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Query(filters): Query<AllocationFilterParams>,
) -> Result<Json<Vec<SubjectAllocation>>, AppError> {
    Ok(Json(TimetableService::list_allocations(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/timetable/allocations",
    request_body = CreateAllocationDto,
    responses(
        (status = 201, description = "Allocation created", body = SubjectAllocation),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Subject already allocated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn create_allocation(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    ValidatedJson(dto): ValidatedJson<CreateAllocationDto>,
) -> Result<(StatusCode, Json<SubjectAllocation>), AppError> {
    let allocation = TimetableService::create_allocation(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

#[utoipa::path(
    put,
    path = "/api/timetable/allocations/{id}",
    params(("id" = uuid::Uuid, Path, description = "Allocation ID")),
    request_body = UpdateAllocationDto,
    responses(
        (status = 200, description = "Allocation updated", body = SubjectAllocation),
        (status = 404, description = "Allocation or teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn update_allocation(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Path(id): Path<AllocationId>,
    ValidatedJson(dto): ValidatedJson<UpdateAllocationDto>,
) -> Result<Json<SubjectAllocation>, AppError> {
    Ok(Json(TimetableService::update_allocation(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/timetable/allocations/{id}",
    params(("id" = uuid::Uuid, Path, description = "Allocation ID")),
    responses(
        (status = 204, description = "Allocation deleted"),
        (status = 404, description = "Allocation not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn delete_allocation(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Path(id): Path<AllocationId>,
) -> Result<StatusCode, AppError> {
    TimetableService::delete_allocation(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/timetable/slots",
    params(SlotFilterParams),
    responses(
        (status = 200, description = "Slots", body = Vec<TimetableSlot>)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn list_slots(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Query(filters): Query<SlotFilterParams>,
) -> Result<Json<Vec<TimetableSlot>>, AppError> {
    Ok(Json(TimetableService::list_slots(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/timetable/slots",
    request_body = CreateSlotDto,
    responses(
        (status = 201, description = "Slot created", body = TimetableSlot),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Class already booked in this period", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn create_slot(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    ValidatedJson(dto): ValidatedJson<CreateSlotDto>,
) -> Result<(StatusCode, Json<TimetableSlot>), AppError> {
    let slot = TimetableService::create_slot(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[utoipa::path(
    put,
    path = "/api/timetable/slots/{id}",
    params(("id" = uuid::Uuid, Path, description = "Slot ID")),
    request_body = UpdateSlotDto,
    responses(
        (status = 200, description = "Slot updated", body = TimetableSlot),
        (status = 404, description = "Slot or teacher not found", body = ErrorResponse),
        (status = 409, description = "Class already booked in this period", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn update_slot(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Path(id): Path<SlotId>,
    ValidatedJson(dto): ValidatedJson<UpdateSlotDto>,
) -> Result<Json<TimetableSlot>, AppError> {
    Ok(Json(TimetableService::update_slot(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/timetable/slots/{id}",
    params(("id" = uuid::Uuid, Path, description = "Slot ID")),
    responses(
        (status = 204, description = "Slot deleted"),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn delete_slot(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Path(id): Path<SlotId>,
) -> Result<StatusCode, AppError> {
    TimetableService::delete_slot(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Teacher and room double-bookings plus allocation mismatches for a term
#[utoipa::path(
    get,
    path = "/api/timetable/conflicts",
    params(TermParams),
    responses(
        (status = 200, description = "Conflict report", body = ConflictReport)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_conflicts(
    State(state): State<AppState>,
    _guard: RequireTimetable,
    Query(params): Query<TermParams>,
) -> Result<Json<ConflictReport>, AppError> {
    Ok(Json(TimetableService::conflicts(&state.db, &params.term).await?))
}

#[utoipa::path(
    get,
    path = "/api/timetable/my",
    params(TermParams),
    responses(
        (status = 200, description = "Own class timetable", body = MyTimetable),
        (status = 403, description = "No linked student or no class", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn my_timetable(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(params): Query<TermParams>,
) -> Result<Json<MyTimetable>, AppError> {
    let student_id = StudentService::resolve_self(&state.db, &auth_user, None).await?;
    Ok(Json(
        TimetableService::student_timetable(&state.db, student_id, &params.term).await?,
    ))
}
