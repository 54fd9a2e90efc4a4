use crate::{env_flag, env_or};

/// Background job scheduler settings.
#[derive(Clone, Debug)]
pub struct JobsConfig {
    pub enabled: bool,
    /// Seed value for the reminder lead time when no stored settings exist yet.
    pub reminder_days_ahead: i64,
    pub overdue_interval_secs: u64,
    pub daily_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_days_ahead: 3,
            overdue_interval_secs: 3600,
            daily_interval_secs: 86_400,
        }
    }
}

impl JobsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("JOBS_ENABLED", defaults.enabled),
            reminder_days_ahead: env_or("REMINDER_DAYS_AHEAD", defaults.reminder_days_ahead),
            overdue_interval_secs: env_or("OVERDUE_SWEEP_INTERVAL_SECS", defaults.overdue_interval_secs),
            daily_interval_secs: env_or("DAILY_JOB_INTERVAL_SECS", defaults.daily_interval_secs),
        }
    }
}
