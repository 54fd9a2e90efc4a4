pub mod controller;
pub mod model;
pub mod router;
pub mod service;
pub mod sweeps;

pub use model::*;
pub use router::init_fees_router;
