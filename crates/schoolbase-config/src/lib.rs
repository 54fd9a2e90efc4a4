//! # Schoolbase Config
//!
//! Configuration types for the Schoolbase API, loaded from environment variables:
//!
//! - [`jwt`]: JWT signing configuration
//! - [`cors`]: CORS allowed origins
//! - [`email`]: SMTP settings for the outbound notifier
//! - [`server`]: listener, database pool, logging and metrics settings
//! - [`jobs`]: background job scheduler settings
//!
//! # Example
//!
//! ```ignore
//! use schoolbase_config::{JwtConfig, EmailConfig, ServerConfig};
//!
//! schoolbase_config::load_env();
//! let jwt_config = JwtConfig::from_env();
//! let email_config = EmailConfig::from_env();
//! let server_config = ServerConfig::from_env();
//! ```

use std::env;
use std::str::FromStr;

pub mod cors;
pub mod email;
pub mod jobs;
pub mod jwt;
pub mod server;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jobs::JobsConfig;
pub use jwt::JwtConfig;
pub use server::ServerConfig;

/// Loads a `.env` file from the working directory if one exists.
pub fn load_env() {
    dotenvy::dotenv().ok();
}

pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => parse_flag(&v).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_env_or_falls_back_on_missing_key() {
        let v: u16 = env_or("SCHOOLBASE_TEST_UNSET_KEY_1", 42);
        assert_eq!(v, 42);
    }
}
