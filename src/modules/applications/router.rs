use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    approve_application, get_application, get_application_status, list_applications,
    reject_application, submit_application,
};
use crate::state::AppState;

/// Unauthenticated routes for applicants.
pub fn init_public_applications_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_application))
        .route("/{reference}", get(get_application_status))
}

pub fn init_applications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_applications))
        .route("/{id}", get(get_application))
        .route("/{id}/approve", post(approve_application))
        .route("/{id}/reject", post(reject_application))
}
