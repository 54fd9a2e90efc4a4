//! # Schoolbase Auth
//!
//! Role model, scoped access rules and JWT utilities for the Schoolbase API.
//!
//! - [`roles`]: the closed [`Role`] enumeration, [`RoleSet`], [`authorize`] and
//!   the role groups guarding each area
//! - [`scope`]: the gender overlay for boarding supervisors and student
//!   self-scoping
//! - [`claims`] / [`jwt`]: access token claims, creation and verification
//!
//! # Example
//!
//! ```ignore
//! use schoolbase_auth::{authorize, guards, verify_token};
//!
//! let claims = verify_token(&token, &jwt_config)?;
//! authorize(&claims.role_set(), guards::ACCOUNTING).map_err(|e| e.into_app_error())?;
//! ```

pub mod claims;
pub mod error;
pub mod jwt;
pub mod roles;
pub mod scope;

pub use claims::Claims;
pub use error::AuthzError;
pub use jwt::{create_access_token, verify_token};
pub use roles::{Role, RoleSet, authorize, guards};
pub use scope::{Gender, check_gender_scope, has_gender_scope, resolve_self_student};
