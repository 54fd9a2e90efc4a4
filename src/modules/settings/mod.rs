//! HTTP surface over the versioned settings store held in `AppState`.

pub mod controller;
pub mod model;
pub mod router;

pub use model::*;
pub use router::init_settings_router;
