//! Expenses, payroll and the read-only financial projections built over them.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use schoolbase_core::PaginationParams;
use schoolbase_core::csv::CsvWriter;
use schoolbase_core::serde::empty_string_as_none;

use crate::fees::FeeInvoice;
use crate::ids::{ExpenseId, PayrollId, UserId};

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses `YYYY-MM` into the half-open range `[first day, first day of next month)`.
pub fn month_range(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, mon) = month.trim().split_once('-')?;
    if year.len() != 4 || mon.len() != 2 {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year.parse().ok()?, mon.parse().ok()?, 1)?;
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
    };
    Some((start, end))
}

/// `YYYY-MM` label for the month containing `date`.
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn validate_month(month: &str) -> Result<(), ValidationError> {
    match month_range(month) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("month_format")),
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Expense {
    pub id: ExpenseId,
    pub date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub amount: f64,
    pub vendor: Option<String>,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateExpenseDto {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "utilities")]
    pub category: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(length(max = 100))]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateExpenseDto {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
    #[validate(length(max = 100))]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExpenseFilterParams {
    pub category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Payroll {
    pub id: PayrollId,
    /// `YYYY-MM`.
    pub month: String,
    pub staff_name: String,
    pub role: Option<String>,
    pub gross: f64,
    pub deductions: f64,
    pub net: f64,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_payroll_amounts"))]
pub struct CreatePayrollDto {
    #[validate(custom(function = "validate_month"))]
    #[schema(example = "2024-05")]
    pub month: String,
    #[validate(length(min = 1, max = 200))]
    pub staff_name: String,
    #[validate(length(max = 100))]
    pub role: Option<String>,
    #[validate(range(min = 0.0))]
    pub gross: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub deductions: f64,
    pub paid_on: Option<NaiveDate>,
}

fn validate_payroll_amounts(dto: &CreatePayrollDto) -> Result<(), ValidationError> {
    if dto.deductions > dto.gross {
        return Err(ValidationError::new("deductions_exceed_gross"));
    }
    Ok(())
}

impl CreatePayrollDto {
    pub fn net(&self) -> f64 {
        payroll_net(self.gross, self.deductions)
    }
}

pub fn payroll_net(gross: f64, deductions: f64) -> f64 {
    round_cents(gross - deductions)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePayrollDto {
    #[validate(custom(function = "validate_month"))]
    pub month: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub staff_name: Option<String>,
    #[validate(length(max = 100))]
    pub role: Option<String>,
    #[validate(range(min = 0.0))]
    pub gross: Option<f64>,
    #[validate(range(min = 0.0))]
    pub deductions: Option<f64>,
    pub paid_on: Option<NaiveDate>,
}

impl UpdatePayrollDto {
    /// Applies the patch and recomputes `net`.
    pub fn apply(&self, row: &mut Payroll) {
        if let Some(month) = &self.month {
            row.month = month.clone();
        }
        if let Some(name) = &self.staff_name {
            row.staff_name = name.clone();
        }
        if self.role.is_some() {
            row.role = self.role.clone();
        }
        row.gross = self.gross.unwrap_or(row.gross);
        row.deductions = self.deductions.unwrap_or(row.deductions);
        if self.paid_on.is_some() {
            row.paid_on = self.paid_on;
        }
        row.net = payroll_net(row.gross, row.deductions);
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PayrollFilterParams {
    pub month: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct MonthParams {
    /// `YYYY-MM`; omitted means all time.
    pub month: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SeriesParams {
    /// Number of months ending with the current one.
    #[serde(default = "default_series_months", deserialize_with = "months_or_default")]
    #[param(value_type = Option<u32>)]
    pub months: u32,
}

fn default_series_months() -> u32 {
    6
}

fn months_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed: Option<u32> = empty_string_as_none(deserializer)?;
    Ok(parsed.unwrap_or_else(default_series_months).clamp(1, 36))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct AccountingSummary {
    pub fees_collected: f64,
    pub expenses: f64,
    pub payroll: f64,
    pub net: f64,
}

impl AccountingSummary {
    pub fn new(fees_collected: f64, expenses: f64, payroll: f64) -> Self {
        Self {
            fees_collected: round_cents(fees_collected),
            expenses: round_cents(expenses),
            payroll: round_cents(payroll),
            net: round_cents(fees_collected - expenses - payroll),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyPoint {
    pub month: String,
    #[serde(flatten)]
    pub summary: AccountingSummary,
}

/// The `count` months ending with the month containing `today`, oldest first.
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<String> {
    let mut year = today.year();
    let mut month = today.month();
    let mut labels = Vec::with_capacity(count as usize);
    for _ in 0..count {
        labels.push(format!("{year:04}-{month:02}"));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    labels.reverse();
    labels
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ProfitAndLoss {
    pub revenue: f64,
    pub expenses: f64,
    pub payroll: f64,
    pub net_profit: f64,
}

impl From<AccountingSummary> for ProfitAndLoss {
    fn from(s: AccountingSummary) -> Self {
        Self {
            revenue: s.fees_collected,
            expenses: s.expenses,
            payroll: s.payroll,
            net_profit: s.net,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Assets {
    pub cash: f64,
    pub receivables: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Liabilities {
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BalanceSheet {
    pub assets: Assets,
    pub liabilities: Liabilities,
    pub equity: f64,
}

impl BalanceSheet {
    /// Cash is everything collected less everything spent; receivables are
    /// open invoice balances. No liabilities are tracked.
    pub fn new(summary: AccountingSummary, receivables: f64) -> Self {
        let cash = summary.net;
        let receivables = round_cents(receivables);
        let total = round_cents(cash + receivables);
        Self {
            assets: Assets {
                cash,
                receivables,
                total,
            },
            liabilities: Liabilities { total: 0.0 },
            equity: total,
        }
    }
}

pub fn invoices_csv(rows: &[FeeInvoice]) -> String {
    let mut csv = CsvWriter::with_header(&[
        "id", "student_id", "term", "amount", "balance", "late_fee", "total_due", "status", "due_date",
    ]);
    for inv in rows {
        csv.row(&[
            inv.id.to_string(),
            inv.student_id.to_string(),
            inv.term.clone(),
            inv.amount.to_string(),
            inv.balance.to_string(),
            inv.late_fee.to_string(),
            inv.total_due().to_string(),
            inv.status.to_string(),
            inv.due_date.map(|d| d.to_string()).unwrap_or_default(),
        ]);
    }
    csv.finish()
}

pub fn expenses_csv(rows: &[Expense]) -> String {
    let mut csv =
        CsvWriter::with_header(&["id", "date", "category", "description", "amount", "vendor"]);
    for e in rows {
        csv.row(&[
            e.id.to_string(),
            e.date.to_string(),
            e.category.clone(),
            e.description.clone().unwrap_or_default(),
            e.amount.to_string(),
            e.vendor.clone().unwrap_or_default(),
        ]);
    }
    csv.finish()
}

pub fn payroll_csv(rows: &[Payroll]) -> String {
    let mut csv = CsvWriter::with_header(&[
        "id", "month", "staff_name", "role", "gross", "deductions", "net", "paid_on",
    ]);
    for p in rows {
        csv.row(&[
            p.id.to_string(),
            p.month.clone(),
            p.staff_name.clone(),
            p.role.clone().unwrap_or_default(),
            p.gross.to_string(),
            p.deductions.to_string(),
            p.net.to_string(),
            p.paid_on.map(|d| d.to_string()).unwrap_or_default(),
        ]);
    }
    csv.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range() {
        assert_eq!(month_range("2024-02"), Some((date(2024, 2, 1), date(2024, 3, 1))));
        assert_eq!(month_range("2024-12"), Some((date(2024, 12, 1), date(2025, 1, 1))));
        assert_eq!(month_range("2024-13"), None);
        assert_eq!(month_range("2024-5"), None);
        assert_eq!(month_range("May 2024"), None);
    }

    #[test]
    fn test_trailing_months_cross_year() {
        assert_eq!(
            trailing_months(date(2024, 2, 15), 4),
            vec!["2023-11", "2023-12", "2024-01", "2024-02"]
        );
    }

    #[test]
    fn test_summary_net() {
        let s = AccountingSummary::new(1000.0, 250.5, 400.0);
        assert_eq!(s.net, 349.5);
        let pl = ProfitAndLoss::from(s);
        assert_eq!(pl.net_profit, 349.5);
        assert_eq!(pl.revenue, 1000.0);
    }

    #[test]
    fn test_balance_sheet_totals() {
        let sheet = BalanceSheet::new(AccountingSummary::new(500.0, 100.0, 0.0), 250.0);
        assert_eq!(sheet.assets.cash, 400.0);
        assert_eq!(sheet.assets.total, 650.0);
        assert_eq!(sheet.liabilities.total, 0.0);
        assert_eq!(sheet.equity, 650.0);
    }

    #[test]
    fn test_payroll_net_and_validation() {
        let dto: CreatePayrollDto = serde_json::from_str(
            r#"{"month":"2024-05","staff_name":"J. Otieno","gross":5000,"deductions":750}"#,
        )
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.net(), 4250.0);

        let bad: CreatePayrollDto = serde_json::from_str(
            r#"{"month":"May","staff_name":"J. Otieno","gross":100,"deductions":200}"#,
        )
        .unwrap();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("month"));
    }

    #[test]
    fn test_expenses_csv_escapes() {
        let e = Expense {
            id: ExpenseId::new(),
            date: date(2024, 5, 2),
            category: "supplies".into(),
            description: Some("chalk, markers".into()),
            amount: 12.5,
            vendor: None,
            recorded_by: None,
            created_at: Utc::now(),
        };
        let csv = expenses_csv(&[e]);
        assert!(csv.starts_with("id,date,category,description,amount,vendor\r\n"));
        assert!(csv.contains("\"chalk, markers\",12.5,"));
    }
}
