//! # Schoolbase Core
//!
//! Core types, errors, and utilities for the Schoolbase API.
//!
//! This crate provides foundational types used throughout the application:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Pagination utilities for list endpoints
//! - [`password`]: Password hashing and verification
//! - [`serde`]: Query-string deserialization helpers
//! - [`compact`]: Run-length compaction of ordered sequences
//! - [`csv`]: Minimal CSV writer for report exports
//!
//! # Example
//!
//! ```ignore
//! use schoolbase_core::errors::AppError;
//! use schoolbase_core::pagination::PaginationParams;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Invoice not found"));
//! let params = PaginationParams::default();
//! let limit = params.limit();
//! ```

pub mod compact;
pub mod csv;
pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

// Re-export commonly used types at crate root
pub use compact::{Run, compact_adjacent};
pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
