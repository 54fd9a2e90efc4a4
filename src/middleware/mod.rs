//! Middleware and extractors for authentication and role checks.
//!
//! - [`auth`]: the [`AuthUser`](auth::AuthUser) extractor and one guard
//!   extractor per functional area, built with `require_roles!`
//! - [`role`]: route layers and in-handler role checks
//!
//! Resource-dependent rules (gender scope, self scope, teaching scope) need
//! the resource itself and are applied in the services after these guards pass.
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::RequireAccounting;
//!
//! async fn list_invoices(RequireAccounting(auth_user): RequireAccounting) -> impl IntoResponse {
//!     // Only Accountant, Headmaster and IT Support reach this point
//! }
//! ```

pub mod auth;
pub mod role;
