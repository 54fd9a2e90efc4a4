use std::collections::HashMap;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::SchoolSettings;
use schoolbase_models::fees::FeeInvoice;
use schoolbase_models::ids::{ExpenseId, PayrollId, UserId};

use crate::modules::accounting::model::{
    AccountingSummary, BalanceSheet, CreateExpenseDto, CreatePayrollDto, Expense,
    ExpenseFilterParams, MonthParams, MonthlyPoint, Payroll, PayrollFilterParams, ProfitAndLoss,
    UpdateExpenseDto, UpdatePayrollDto, month_range, trailing_months,
};
use crate::modules::fees::service::INVOICE_COLUMNS;

const EXPENSE_COLUMNS: &str =
    "id, date, category, description, amount, vendor, recorded_by, created_at";

const PAYROLL_COLUMNS: &str =
    "id, month, staff_name, role, gross, deductions, net, paid_on, created_at";

/// Reporting window. Payments and expenses are filtered by date, payroll by
/// its month label.
#[derive(Debug, Default)]
struct Window {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    month: Option<String>,
}

impl Window {
    fn from_params(params: &MonthParams) -> Result<Self, AppError> {
        let Some(month) = params.month.as_deref().map(str::trim).filter(|m| !m.is_empty()) else {
            return Ok(Self::default());
        };
        let (start, end) = month_range(month).ok_or_else(|| {
            AppError::unprocessable(anyhow!("month must be formatted as YYYY-MM"))
        })?;
        Ok(Self {
            start: Some(start),
            end: Some(end),
            month: Some(month.to_string()),
        })
    }
}

fn expense_not_found() -> AppError {
    AppError::not_found(anyhow!("Expense not found"))
}

fn payroll_not_found() -> AppError {
    AppError::not_found(anyhow!("Payroll entry not found"))
}

pub struct AccountingService;

impl AccountingService {
    #[instrument(skip(db, settings, dto))]
    pub async fn create_expense(
        db: &PgPool,
        settings: &SchoolSettings,
        recorded_by: UserId,
        dto: CreateExpenseDto,
    ) -> Result<Expense, AppError> {
        let category = dto.category.trim();
        if !settings.accepts_expense_category(category) {
            return Err(AppError::unprocessable(anyhow!(
                "Unknown expense category: {}",
                category
            )));
        }

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (date, category, description, amount, vendor, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(dto.date)
        .bind(category)
        .bind(&dto.description)
        .bind(dto.amount)
        .bind(&dto.vendor)
        .bind(recorded_by)
        .fetch_one(db)
        .await
        .context("Failed to record expense")
        .map_err(AppError::database)?;

        tracing::info!(expense_id = %expense.id, amount = expense.amount, "Expense recorded");
        Ok(expense)
    }

    #[instrument(skip(db))]
    pub async fn list_expenses(
        db: &PgPool,
        filters: ExpenseFilterParams,
    ) -> Result<Paginated<Expense>, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM expenses
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            "#,
        )
        .bind(&filters.category)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await
        .context("Failed to count expenses")
        .map_err(AppError::database)?;

        let expenses = sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC, created_at DESC, id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&filters.category)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch expenses")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data: expenses,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_expense(db: &PgPool, id: ExpenseId) -> Result<Expense, AppError> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch expense")
        .map_err(AppError::database)?
        .ok_or_else(expense_not_found)
    }

    #[instrument(skip(db, settings, dto))]
    pub async fn update_expense(
        db: &PgPool,
        settings: &SchoolSettings,
        id: ExpenseId,
        dto: UpdateExpenseDto,
    ) -> Result<Expense, AppError> {
        let category = dto.category.as_deref().map(str::trim);
        if let Some(category) = category {
            if !settings.accepts_expense_category(category) {
                return Err(AppError::unprocessable(anyhow!(
                    "Unknown expense category: {}",
                    category
                )));
            }
        }

        sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
            SET date = COALESCE($2, date),
                category = COALESCE($3, category),
                description = COALESCE($4, description),
                amount = COALESCE($5, amount),
                vendor = COALESCE($6, vendor)
            WHERE id = $1
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.date)
        .bind(category)
        .bind(&dto.description)
        .bind(dto.amount)
        .bind(&dto.vendor)
        .fetch_optional(db)
        .await
        .context("Failed to update expense")
        .map_err(AppError::database)?
        .ok_or_else(expense_not_found)
    }

    #[instrument(skip(db))]
    pub async fn delete_expense(db: &PgPool, id: ExpenseId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete expense")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(expense_not_found());
        }
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_payroll(db: &PgPool, dto: CreatePayrollDto) -> Result<Payroll, AppError> {
        let payroll = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            INSERT INTO payroll (month, staff_name, role, gross, deductions, net, paid_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(dto.month.trim())
        .bind(dto.staff_name.trim())
        .bind(&dto.role)
        .bind(dto.gross)
        .bind(dto.deductions)
        .bind(dto.net())
        .bind(dto.paid_on)
        .fetch_one(db)
        .await
        .context("Failed to create payroll entry")
        .map_err(AppError::database)?;

        tracing::info!(payroll_id = %payroll.id, month = %payroll.month, "Payroll entry created");
        Ok(payroll)
    }

    #[instrument(skip(db))]
    pub async fn list_payroll(
        db: &PgPool,
        filters: PayrollFilterParams,
    ) -> Result<Paginated<Payroll>, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payroll WHERE ($1::text IS NULL OR month = $1)",
        )
        .bind(&filters.month)
        .fetch_one(db)
        .await
        .context("Failed to count payroll entries")
        .map_err(AppError::database)?;

        let rows = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            SELECT {PAYROLL_COLUMNS}
            FROM payroll
            WHERE ($1::text IS NULL OR month = $1)
            ORDER BY month DESC, staff_name, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&filters.month)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch payroll entries")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data: rows,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_payroll(db: &PgPool, id: PayrollId) -> Result<Payroll, AppError> {
        sqlx::query_as::<_, Payroll>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch payroll entry")
        .map_err(AppError::database)?
        .ok_or_else(payroll_not_found)
    }

    /// Net is recomputed from the merged gross and deductions.
    #[instrument(skip(db, dto))]
    pub async fn update_payroll(
        db: &PgPool,
        id: PayrollId,
        dto: UpdatePayrollDto,
    ) -> Result<Payroll, AppError> {
        let mut row = Self::get_payroll(db, id).await?;
        dto.apply(&mut row);

        if row.deductions > row.gross {
            return Err(AppError::unprocessable(anyhow!(
                "Deductions cannot exceed gross pay"
            )));
        }

        sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payroll
            SET month = $2, staff_name = $3, role = $4, gross = $5,
                deductions = $6, net = $7, paid_on = $8
            WHERE id = $1
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(row.month.trim())
        .bind(row.staff_name.trim())
        .bind(&row.role)
        .bind(row.gross)
        .bind(row.deductions)
        .bind(row.net)
        .bind(row.paid_on)
        .fetch_optional(db)
        .await
        .context("Failed to update payroll entry")
        .map_err(AppError::database)?
        .ok_or_else(payroll_not_found)
    }

    #[instrument(skip(db))]
    pub async fn delete_payroll(db: &PgPool, id: PayrollId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM payroll WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete payroll entry")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(payroll_not_found());
        }
        Ok(())
    }

    /// Confirmed payments, expenses and net payroll over the window.
    #[instrument(skip(db))]
    pub async fn summary(db: &PgPool, params: MonthParams) -> Result<AccountingSummary, AppError> {
        let window = Window::from_params(&params)?;
        Self::summarize(db, &window).await
    }

    async fn summarize(db: &PgPool, window: &Window) -> Result<AccountingSummary, AppError> {
        let (fees, expenses, payroll) = sqlx::query_as::<_, (f64, f64, f64)>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(amount), 0) FROM fee_payments
                 WHERE status = 'confirmed'
                   AND ($1::date IS NULL OR date >= $1)
                   AND ($2::date IS NULL OR date < $2)),
                (SELECT COALESCE(SUM(amount), 0) FROM expenses
                 WHERE ($1::date IS NULL OR date >= $1)
                   AND ($2::date IS NULL OR date < $2)),
                (SELECT COALESCE(SUM(net), 0) FROM payroll
                 WHERE ($3::text IS NULL OR month = $3))
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(&window.month)
        .fetch_one(db)
        .await
        .context("Failed to compute accounting summary")
        .map_err(AppError::database)?;

        Ok(AccountingSummary::new(fees, expenses, payroll))
    }

    /// One point per month, oldest first, ending with the month of `today`.
    #[instrument(skip(db))]
    pub async fn monthly_series(
        db: &PgPool,
        months: u32,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyPoint>, AppError> {
        let labels = trailing_months(today, months);
        let (Some(first), Some(last)) = (labels.first(), labels.last()) else {
            return Ok(Vec::new());
        };
        let start = month_range(first).map(|(start, _)| start);
        let end = month_range(last).map(|(_, end)| end);
        let (Some(start), Some(end)) = (start, end) else {
            return Err(AppError::internal(anyhow!("Invalid month label in series")));
        };

        let fees: HashMap<String, f64> = sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT to_char(date, 'YYYY-MM'), SUM(amount)
            FROM fee_payments
            WHERE status = 'confirmed' AND date >= $1 AND date < $2
            GROUP BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
        .context("Failed to total payments by month")
        .map_err(AppError::database)?
        .into_iter()
        .collect();

        let expenses: HashMap<String, f64> = sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT to_char(date, 'YYYY-MM'), SUM(amount)
            FROM expenses
            WHERE date >= $1 AND date < $2
            GROUP BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
        .context("Failed to total expenses by month")
        .map_err(AppError::database)?
        .into_iter()
        .collect();

        let payroll: HashMap<String, f64> = sqlx::query_as::<_, (String, f64)>(
            "SELECT month, SUM(net) FROM payroll WHERE month = ANY($1) GROUP BY month",
        )
        .bind(&labels)
        .fetch_all(db)
        .await
        .context("Failed to total payroll by month")
        .map_err(AppError::database)?
        .into_iter()
        .collect();

        Ok(labels
            .into_iter()
            .map(|month| {
                let summary = AccountingSummary::new(
                    fees.get(&month).copied().unwrap_or(0.0),
                    expenses.get(&month).copied().unwrap_or(0.0),
                    payroll.get(&month).copied().unwrap_or(0.0),
                );
                MonthlyPoint { month, summary }
            })
            .collect())
    }

    #[instrument(skip(db))]
    pub async fn profit_and_loss(db: &PgPool, params: MonthParams) -> Result<ProfitAndLoss, AppError> {
        Ok(Self::summary(db, params).await?.into())
    }

    /// All-time cash position plus open invoice balances as receivables.
    #[instrument(skip(db))]
    pub async fn balance_sheet(db: &PgPool) -> Result<BalanceSheet, AppError> {
        let summary = Self::summarize(db, &Window::default()).await?;

        let receivables: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(balance), 0) FROM fee_invoices")
                .fetch_one(db)
                .await
                .context("Failed to total receivables")
                .map_err(AppError::database)?;

        Ok(BalanceSheet::new(summary, receivables))
    }

    #[instrument(skip(db))]
    pub async fn invoices_for_export(db: &PgPool) -> Result<Vec<FeeInvoice>, AppError> {
        sqlx::query_as::<_, FeeInvoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM fee_invoices ORDER BY created_at, id"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch invoices for export")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn expenses_for_export(
        db: &PgPool,
        params: MonthParams,
    ) -> Result<Vec<Expense>, AppError> {
        let window = Window::from_params(&params)?;

        sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date < $2)
            ORDER BY date, id
            "#
        ))
        .bind(window.start)
        .bind(window.end)
        .fetch_all(db)
        .await
        .context("Failed to fetch expenses for export")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn payroll_for_export(
        db: &PgPool,
        params: MonthParams,
    ) -> Result<Vec<Payroll>, AppError> {
        let window = Window::from_params(&params)?;

        sqlx::query_as::<_, Payroll>(&format!(
            r#"
            SELECT {PAYROLL_COLUMNS}
            FROM payroll
            WHERE ($1::text IS NULL OR month = $1)
            ORDER BY month, staff_name, id
            "#
        ))
        .bind(&window.month)
        .fetch_all(db)
        .await
        .context("Failed to fetch payroll for export")
        .map_err(AppError::database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_window_from_month() {
        let window = Window::from_params(&MonthParams {
            month: Some("2024-12".to_string()),
        })
        .unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 12, 1));
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(window.month.as_deref(), Some("2024-12"));
    }

    #[test]
    fn test_window_blank_month_is_all_time() {
        let window = Window::from_params(&MonthParams {
            month: Some("  ".to_string()),
        })
        .unwrap();
        assert!(window.start.is_none() && window.end.is_none() && window.month.is_none());
    }

    #[test]
    fn test_window_rejects_bad_month() {
        let err = Window::from_params(&MonthParams {
            month: Some("Dec 2024".to_string()),
        })
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
