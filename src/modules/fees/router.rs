use axum::{
    Router,
    routing::{get, post, put},
};

use super::controller::{
    create_fee_structure, create_invoice, create_waiver, delete_fee_structure, delete_invoice,
    get_fee_structure, get_invoice, list_fee_structures, list_invoices, list_overdue,
    list_payments, list_waivers, my_fees, record_payment, run_overdue_sweep, run_reminder_sweep,
    update_fee_structure, update_invoice, update_payment_status,
};
use crate::state::AppState;

pub fn init_fees_router() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{id}",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/payments", get(list_payments))
        .route("/payments", post(record_payment))
        .route("/payments/{id}/status", put(update_payment_status))
        .route("/waivers", get(list_waivers).post(create_waiver))
        .route(
            "/structures",
            get(list_fee_structures).post(create_fee_structure),
        )
        .route(
            "/structures/{id}",
            get(get_fee_structure)
                .put(update_fee_structure)
                .delete(delete_fee_structure),
        )
        .route("/overdue", get(list_overdue))
        .route("/sweeps/overdue", post(run_overdue_sweep))
        .route("/sweeps/reminders", post(run_reminder_sweep))
        .route("/my", get(my_fees))
}
