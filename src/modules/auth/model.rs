pub use schoolbase_models::auth::{Claims, LoginRequest, LoginResponse, MessageResponse};
