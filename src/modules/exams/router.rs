use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_assessment, delete_assessment, get_assessment, get_results, list_assessments,
    update_assessment, upsert_results,
};
use crate::state::AppState;

pub fn init_exams_router() -> Router<AppState> {
    Router::new()
        .route("/assessments", get(list_assessments).post(create_assessment))
        .route(
            "/assessments/{id}",
            get(get_assessment)
                .put(update_assessment)
                .delete(delete_assessment),
        )
        .route("/assessments/{id}/results", get(get_results))
        .route("/results", post(upsert_results))
}
