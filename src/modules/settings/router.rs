use axum::{Router, routing::get};

use super::controller::{get_settings, update_settings};
use crate::state::AppState;

pub fn init_settings_router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}
