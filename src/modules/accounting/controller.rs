use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::ids::{ExpenseId, PayrollId, UserId};

use super::model::{
    AccountingSummary, BalanceSheet, CreateExpenseDto, CreatePayrollDto, Expense,
    ExpenseFilterParams, MonthParams, MonthlyPoint, Payroll, PayrollFilterParams, ProfitAndLoss,
    SeriesParams, UpdateExpenseDto, UpdatePayrollDto, expenses_csv, invoices_csv, payroll_csv,
};
use super::service::AccountingService;
use crate::export::csv_attachment;
use crate::middleware::auth::RequireAccounting;
use crate::middleware::role::ensure_accounting_write;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/accounting/expenses",
    request_body = CreateExpenseDto,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown category", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state, dto))]
pub async fn create_expense(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<CreateExpenseDto>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let settings = state.settings.current().await?.value;
    let recorded_by = UserId::from(auth_user.user_id()?);
    let expense = AccountingService::create_expense(&state.db, &settings, recorded_by, dto).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    get,
    path = "/api/accounting/expenses",
    params(ExpenseFilterParams),
    responses(
        (status = 200, description = "Paginated expenses", body = Paginated<Expense>)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(filters): Query<ExpenseFilterParams>,
) -> Result<Json<Paginated<Expense>>, AppError> {
    Ok(Json(AccountingService::list_expenses(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/accounting/expenses/{id}",
    params(("id" = uuid::Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense", body = Expense),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn get_expense(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Path(id): Path<ExpenseId>,
) -> Result<Json<Expense>, AppError> {
    Ok(Json(AccountingService::get_expense(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/accounting/expenses/{id}",
    params(("id" = uuid::Uuid, Path, description = "Expense ID")),
    request_body = UpdateExpenseDto,
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state, dto))]
pub async fn update_expense(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<ExpenseId>,
    ValidatedJson(dto): ValidatedJson<UpdateExpenseDto>,
) -> Result<Json<Expense>, AppError> {
    ensure_accounting_write(&auth_user)?;
    let settings = state.settings.current().await?.value;
    Ok(Json(
        AccountingService::update_expense(&state.db, &settings, id, dto).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/accounting/expenses/{id}",
    params(("id" = uuid::Uuid, Path, description = "Expense ID")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<ExpenseId>,
) -> Result<StatusCode, AppError> {
    ensure_accounting_write(&auth_user)?;
    AccountingService::delete_expense(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Net pay is computed as gross minus deductions
#[utoipa::path(
    post,
    path = "/api/accounting/payroll",
    request_body = CreatePayrollDto,
    responses(
        (status = 201, description = "Payroll entry created", body = Payroll),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state, dto))]
pub async fn create_payroll(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    ValidatedJson(dto): ValidatedJson<CreatePayrollDto>,
) -> Result<(StatusCode, Json<Payroll>), AppError> {
    ensure_accounting_write(&auth_user)?;
    let payroll = AccountingService::create_payroll(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(payroll)))
}

#[utoipa::path(
    get,
    path = "/api/accounting/payroll",
    params(PayrollFilterParams),
    responses(
        (status = 200, description = "Paginated payroll entries", body = Paginated<Payroll>)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn list_payroll(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(filters): Query<PayrollFilterParams>,
) -> Result<Json<Paginated<Payroll>>, AppError> {
    Ok(Json(AccountingService::list_payroll(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/accounting/payroll/{id}",
    params(("id" = uuid::Uuid, Path, description = "Payroll entry ID")),
    responses(
        (status = 200, description = "Payroll entry", body = Payroll),
        (status = 404, description = "Payroll entry not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn get_payroll(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Path(id): Path<PayrollId>,
) -> Result<Json<Payroll>, AppError> {
    Ok(Json(AccountingService::get_payroll(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/accounting/payroll/{id}",
    params(("id" = uuid::Uuid, Path, description = "Payroll entry ID")),
    request_body = UpdatePayrollDto,
    responses(
        (status = 200, description = "Payroll entry updated", body = Payroll),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Payroll entry not found", body = ErrorResponse),
        (status = 422, description = "Deductions exceed gross", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state, dto))]
pub async fn update_payroll(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<PayrollId>,
    ValidatedJson(dto): ValidatedJson<UpdatePayrollDto>,
) -> Result<Json<Payroll>, AppError> {
    ensure_accounting_write(&auth_user)?;
    Ok(Json(AccountingService::update_payroll(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/accounting/payroll/{id}",
    params(("id" = uuid::Uuid, Path, description = "Payroll entry ID")),
    responses(
        (status = 204, description = "Payroll entry deleted"),
        (status = 403, description = "Read-only role", body = ErrorResponse),
        (status = 404, description = "Payroll entry not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn delete_payroll(
    State(state): State<AppState>,
    RequireAccounting(auth_user): RequireAccounting,
    Path(id): Path<PayrollId>,
) -> Result<StatusCode, AppError> {
    ensure_accounting_write(&auth_user)?;
    AccountingService::delete_payroll(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fees collected, expenses, payroll and net for a month or all time
#[utoipa::path(
    get,
    path = "/api/accounting/summary",
    params(MonthParams),
    responses(
        (status = 200, description = "Summary", body = AccountingSummary),
        (status = 422, description = "Bad month", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<MonthParams>,
) -> Result<Json<AccountingSummary>, AppError> {
    Ok(Json(AccountingService::summary(&state.db, params).await?))
}

#[utoipa::path(
    get,
    path = "/api/accounting/monthly",
    params(SeriesParams),
    responses(
        (status = 200, description = "Monthly totals, oldest first", body = Vec<MonthlyPoint>)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn monthly_series(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<SeriesParams>,
) -> Result<Json<Vec<MonthlyPoint>>, AppError> {
    let today = Utc::now().date_naive();
    Ok(Json(
        AccountingService::monthly_series(&state.db, params.months, today).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/accounting/profit-loss",
    params(MonthParams),
    responses(
        (status = 200, description = "Profit and loss", body = ProfitAndLoss),
        (status = 422, description = "Bad month", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn profit_and_loss(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<MonthParams>,
) -> Result<Json<ProfitAndLoss>, AppError> {
    Ok(Json(AccountingService::profit_and_loss(&state.db, params).await?))
}

#[utoipa::path(
    get,
    path = "/api/accounting/balance-sheet",
    responses(
        (status = 200, description = "Balance sheet", body = BalanceSheet)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn balance_sheet(
    State(state): State<AppState>,
    _guard: RequireAccounting,
) -> Result<Json<BalanceSheet>, AppError> {
    Ok(Json(AccountingService::balance_sheet(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/accounting/exports/invoices",
    responses(
        (status = 200, description = "Invoices as CSV", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn export_invoices(
    State(state): State<AppState>,
    _guard: RequireAccounting,
) -> Result<Response, AppError> {
    let invoices = AccountingService::invoices_for_export(&state.db).await?;
    let filename = format!("invoices_{}.csv", Utc::now().date_naive());
    Ok(csv_attachment(&filename, invoices_csv(&invoices)))
}

#[utoipa::path(
    get,
    path = "/api/accounting/exports/expenses",
    params(MonthParams),
    responses(
        (status = 200, description = "Expenses as CSV", content_type = "text/csv", body = String),
        (status = 422, description = "Bad month", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn export_expenses(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<MonthParams>,
) -> Result<Response, AppError> {
    let label = params.month.clone().unwrap_or_else(|| "all".to_string());
    let expenses = AccountingService::expenses_for_export(&state.db, params).await?;
    Ok(csv_attachment(&format!("expenses_{label}.csv"), expenses_csv(&expenses)))
}

#[utoipa::path(
    get,
    path = "/api/accounting/exports/payroll",
    params(MonthParams),
    responses(
        (status = 200, description = "Payroll as CSV", content_type = "text/csv", body = String),
        (status = 422, description = "Bad month", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounting"
)]
#[instrument(skip(state))]
pub async fn export_payroll(
    State(state): State<AppState>,
    _guard: RequireAccounting,
    Query(params): Query<MonthParams>,
) -> Result<Response, AppError> {
    let label = params.month.clone().unwrap_or_else(|| "all".to_string());
    let payroll = AccountingService::payroll_for_export(&state.db, params).await?;
    Ok(csv_attachment(&format!("payroll_{label}.csv"), payroll_csv(&payroll)))
}
