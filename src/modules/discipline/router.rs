use axum::{Router, routing::get};

use super::controller::{
    create_case, delete_case, export_cases, get_case, get_summary, list_cases, update_case,
};
use crate::state::AppState;

pub fn init_discipline_router() -> Router<AppState> {
    Router::new()
        .route("/cases", get(list_cases).post(create_case))
        .route(
            "/cases/{id}",
            get(get_case).put(update_case).delete(delete_case),
        )
        .route("/summary", get(get_summary))
        .route("/export", get(export_cases))
}
