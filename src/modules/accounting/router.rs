use axum::{Router, routing::get};

use super::controller::{
    balance_sheet, create_expense, create_payroll, delete_expense, delete_payroll,
    export_expenses, export_invoices, export_payroll, get_expense, get_payroll, list_expenses,
    list_payroll, monthly_series, profit_and_loss, summary, update_expense, update_payroll,
};
use crate::state::AppState;

pub fn init_accounting_router() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/{id}",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/payroll", get(list_payroll).post(create_payroll))
        .route(
            "/payroll/{id}",
            get(get_payroll).put(update_payroll).delete(delete_payroll),
        )
        .route("/summary", get(summary))
        .route("/monthly", get(monthly_series))
        .route("/profit-loss", get(profit_and_loss))
        .route("/balance-sheet", get(balance_sheet))
        .route("/exports/invoices", get(export_invoices))
        .route("/exports/expenses", get(export_expenses))
        .route("/exports/payroll", get(export_payroll))
}
