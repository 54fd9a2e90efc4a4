use axum::{
    Router,
    routing::{get, put},
};

use super::controller::{
    create_allocation, create_slot, delete_allocation, delete_slot, get_config, get_conflicts,
    list_allocations, list_slots, my_timetable, update_allocation, update_slot, upsert_config,
};
use crate::state::AppState;

pub fn init_timetable_router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config).put(upsert_config))
        .route("/allocations", get(list_allocations).post(create_allocation))
        .route(
            "/allocations/{id}",
            put(update_allocation).delete(delete_allocation),
        )
        .route("/slots", get(list_slots).post(create_slot))
        .route(
            "/slots/{id}",
            put(update_slot).delete(delete_slot),
        )
        .route("/conflicts", get(get_conflicts))
        .route("/my", get(my_timetable))
}
