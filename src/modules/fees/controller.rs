use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::ids::{FeeStructureId, InvoiceId, PaymentId, UserId};

use super::model::{
    CreateFeeStructureDto, CreateInvoiceDto, CreateWaiverDto, FeeInvoice, FeePayment,
    FeeStructure, FeeStructureFilterParams, FeeWaiver, InvoiceDetail, InvoiceFilterParams, MyFees,
    OverdueInvoice, OverdueParams, PaymentReceipt, RecordPaymentDto, SweepReport,
    UpdateFeeStructureDto, UpdateInvoiceDto, UpdatePaymentStatusDto, WaiverFilterParams,
    WaiverWithStudent,
};
use super::service::FeeService;
use super::sweeps::FeeSweeps;
use crate::middleware::auth::{RequireAccounting, RequireStudent};
use crate::middleware::role::ensure_accounting_write;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/fees/invoices",
    request_body = CreateInvoiceDto,
    responses(
        (status = 201, description = "Invoice created", body = FeeInvoice),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn create_invoice(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<CreateInvoiceDto>,
) -> Result<(StatusCode, Json<FeeInvoice>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let invoice = FeeService::create_invoice(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/fees/invoices",
    params(InvoiceFilterParams),
    responses(
        (status = 200, description = "Paginated invoices", body = Paginated<FeeInvoice>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn list_invoices(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(filters): Query<InvoiceFilterParams>,
) -> Result<Json<Paginated<FeeInvoice>>, AppError> {
    Ok(Json(FeeService::list_invoices(&state.db, filters).await?))
}

/// Invoice with its payments and total due
#[utoipa::path(
    get,
    path = "/api/fees/invoices/{id}",
    params(("id" = uuid::Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceDetail),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(FeeService::get_invoice(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/fees/invoices/{id}",
    params(("id" = uuid::Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceDto,
    responses(
        (status = 200, description = "Invoice updated", body = FeeInvoice),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn update_invoice(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<InvoiceId>,
    ValidatedJson(dto): ValidatedJson<UpdateInvoiceDto>,
) -> Result<Json<FeeInvoice>, AppError> {
    ensure_accounting_write(&auth_user)?;
    Ok(Json(FeeService::update_invoice(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/fees/invoices/{id}",
    params(("id" = uuid::Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 204, description = "Invoice deleted or already absent"),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 409, description = "Invoice has payments", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<InvoiceId>,
) -> Result<StatusCode, AppError> {
    ensure_accounting_write(&auth_user)?;
    FeeService::delete_invoice(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/fees/invoices/{id}/payments",
    params(("id" = uuid::Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Payments", body = Vec<FeePayment>),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Path(id): Path<InvoiceId>,
) -> Result<Json<Vec<FeePayment>>, AppError> {
    Ok(Json(FeeService::list_payments(&state.db, id).await?))
}

/// Record a payment against an invoice
#[utoipa::path(
    post,
    path = "/api/fees/payments",
    request_body = RecordPaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentReceipt),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
        (status = 422, description = "Validation error or unsupported method", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn record_payment(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<RecordPaymentDto>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let settings = state.settings.current().await?.value;
    let recorded_by = UserId::from(auth_user.user_id()?);

    let receipt =
        FeeService::record_payment(&state.db, &*state.notifier, &settings, recorded_by, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Reverse or refund a payment; the invoice balance is restored
#[utoipa::path(
    put,
    path = "/api/fees/payments/{id}/status",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = PaymentReceipt),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn update_payment_status(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<PaymentId>,
    Json(dto): Json<UpdatePaymentStatusDto>,
) -> Result<Json<PaymentReceipt>, AppError> {
    ensure_accounting_write(&auth_user)?;
    Ok(Json(FeeService::update_payment_status(&state.db, id, dto.status).await?))
}

#[utoipa::path(
    post,
    path = "/api/fees/waivers",
    request_body = CreateWaiverDto,
    responses(
        (status = 201, description = "Waiver applied", body = FeeWaiver),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Student or invoice not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn create_waiver(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<CreateWaiverDto>,
) -> Result<(StatusCode, Json<FeeWaiver>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let approved_by = UserId::from(auth_user.user_id()?);
    let waiver = FeeService::create_waiver(&state.db, approved_by, dto).await?;
    Ok((StatusCode::CREATED, Json(waiver)))
}

#[utoipa::path(
    get,
    path = "/api/fees/waivers",
    params(WaiverFilterParams),
    responses(
        (status = 200, description = "Waivers", body = Vec<WaiverWithStudent>)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn list_waivers(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(filters): Query<WaiverFilterParams>,
) -> Result<Json<Vec<WaiverWithStudent>>, AppError> {
    Ok(Json(FeeService::list_waivers(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/fees/structures",
    request_body = CreateFeeStructureDto,
    responses(
        (status = 201, description = "Fee structure created", body = FeeStructure),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn create_fee_structure(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<CreateFeeStructureDto>,
) -> Result<(StatusCode, Json<FeeStructure>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let structure = FeeService::create_fee_structure(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(structure)))
}

/// Active structures unless `is_active` says otherwise
#[utoipa::path(
    get,
    path = "/api/fees/structures",
    params(FeeStructureFilterParams),
    responses(
        (status = 200, description = "Fee structures", body = Vec<FeeStructure>)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn list_fee_structures(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(filters): Query<FeeStructureFilterParams>,
) -> Result<Json<Vec<FeeStructure>>, AppError> {
    Ok(Json(FeeService::list_fee_structures(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/fees/structures/{id}",
    params(("id" = uuid::Uuid, Path, description = "Fee structure ID")),
    responses(
        (status = 200, description = "Fee structure", body = FeeStructure),
        (status = 404, description = "Fee structure not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn get_fee_structure(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Path(id): Path<FeeStructureId>,
) -> Result<Json<FeeStructure>, AppError> {
    Ok(Json(FeeService::get_fee_structure(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/fees/structures/{id}",
    params(("id" = uuid::Uuid, Path, description = "Fee structure ID")),
    request_body = UpdateFeeStructureDto,
    responses(
        (status = 200, description = "Fee structure updated", body = FeeStructure),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Fee structure not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state, dto))]
pub async fn update_fee_structure(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<FeeStructureId>,
    ValidatedJson(dto): ValidatedJson<UpdateFeeStructureDto>,
) -> Result<Json<FeeStructure>, AppError> {
    ensure_accounting_write(&auth_user)?;
    Ok(Json(FeeService::update_fee_structure(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/fees/structures/{id}",
    params(("id" = uuid::Uuid, Path, description = "Fee structure ID")),
    responses(
        (status = 204, description = "Fee structure deleted"),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Fee structure not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn delete_fee_structure(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<FeeStructureId>,
) -> Result<StatusCode, AppError> {
    ensure_accounting_write(&auth_user)?;
    FeeService::delete_fee_structure(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Outstanding invoices past due; `days_overdue` defaults to the school setting
#[utoipa::path(
    get,
    path = "/api/fees/overdue",
    params(OverdueParams),
    responses(
        (status = 200, description = "Overdue invoices", body = Vec<OverdueInvoice>)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn list_overdue(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<OverdueParams>,
) -> Result<Json<Vec<OverdueInvoice>>, AppError> {
    let settings = state.settings.current().await?.value;
    let today = Utc::now().date_naive();
    Ok(Json(
        FeeService::list_overdue(&state.db, &settings, params, today).await?,
    ))
}

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/api/fees/sweeps/overdue",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 403, description = "Read-only role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn run_overdue_sweep(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
) -> Result<Json<SweepReport>, AppError> {
    ensure_accounting_write(&auth_user)?;
    let settings = state.settings.current().await?.value;
    let today = Utc::now().date_naive();
    Ok(Json(
        FeeSweeps::run_overdue_sweep(&state.db, &*state.notifier, &settings, today).await?,
    ))
}

/// Send due-date reminders now
#[utoipa::path(
    post,
    path = "/api/fees/sweeps/reminders",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 403, description = "Read-only role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn run_reminder_sweep(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
) -> Result<Json<SweepReport>, AppError> {
    ensure_accounting_write(&auth_user)?;
    let settings = state.settings.current().await?.value;
    let today = Utc::now().date_naive();
    Ok(Json(
        FeeSweeps::run_reminder_sweep(&state.db, &*state.notifier, &settings, today).await?,
    ))
}

/// Own invoices with payments and totals
#[utoipa::path(
    get,
    path = "/api/fees/my",
    responses(
        (status = 200, description = "Own fees", body = MyFees),
        (status = 403, description = "No linked student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
#[instrument(skip(state))]
pub async fn my_fees(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<MyFees>, AppError> {
    let student_id = StudentService::resolve_self(&state.db, &auth_user, None).await?;
    Ok(Json(FeeService::my_fees(&state.db, student_id).await?))
}
