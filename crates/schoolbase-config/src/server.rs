use crate::{env_flag, env_or, env_string};

/// Process-level settings: listener, pool size, logging, metrics.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub database_max_connections: u32,
    pub log_dir: String,
    pub observability_enabled: bool,
    pub metrics_port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            log_dir: env_string("LOG_DIR", "storage/logs"),
            observability_enabled: env_flag("OBSERVABILITY_ENABLED", true),
            metrics_port: env_or("METRICS_PORT", 9090),
        }
    }
}
