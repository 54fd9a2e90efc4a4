use axum::{
    Router,
    routing::{get, put},
};

use super::controller::{
    get_preferences, linked_student_notifications, linked_students, list_notifications,
    mark_all_read, mark_read, unread_count, update_preferences,
};
use crate::state::AppState;

pub fn init_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/guardian/students", get(linked_students))
        .route(
            "/guardian/students/{student_id}",
            get(linked_student_notifications),
        )
}
