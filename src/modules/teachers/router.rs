use axum::{
    Router,
    routing::{delete, get},
};

use super::controller::{
    create_assignment, create_teacher, delete_assignment, delete_teacher, get_teacher,
    get_teachers, list_assignments, update_teacher,
};
use crate::state::AppState;

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_teachers).post(create_teacher))
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route("/assignments/{id}", delete(delete_assignment))
        .route(
            "/{id}",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
}
