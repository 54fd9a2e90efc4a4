use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_template, delete_template, get_template, list_templates, send_bulk_email, send_email,
    send_to_parents, update_template,
};
use crate::state::AppState;

pub fn init_communication_router() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates).post(create_template))
        .route(
            "/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/send", post(send_email))
        .route("/send-bulk", post(send_bulk_email))
        .route("/send-to-parents/{student_id}", post(send_to_parents))
}
