use axum::{
    Router,
    routing::{delete, get, put},
};

use super::controller::{
    create_guardian_link, create_user, deactivate_user, delete_guardian_link, get_user,
    get_users, list_guardian_links, list_roles, set_student_link, update_user,
};
use crate::state::AppState;

/// Admin-only; the caller wraps this router in the `require_admin` layer.
pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users).post(create_user))
        .route("/roles", get(list_roles))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .route("/{id}/student-link", put(set_student_link))
        .route(
            "/{id}/guardian-links",
            get(list_guardian_links).post(create_guardian_link),
        )
        .route("/{id}/guardian-links/{link_id}", delete(delete_guardian_link))
}
