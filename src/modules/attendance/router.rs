use axum::{Router, routing::get};

use super::controller::{get_sheet, get_streaks, mark_attendance, my_attendance};
use crate::state::AppState;

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_sheet).post(mark_attendance))
        .route("/my", get(my_attendance))
        .route("/students/{id}/streaks", get(get_streaks))
}
