use std::sync::Arc;

use sqlx::PgPool;

use schoolbase_config::{CorsConfig, EmailConfig, JobsConfig, JwtConfig};
use schoolbase_models::SchoolSettings;

use crate::notifier::{NoopNotifier, Notifier, SmtpNotifier};
use crate::settings_store::{PgSettingsStore, SettingsStore};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub jobs_config: JobsConfig,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Seed used until the settings row is first written.
pub fn settings_seed(jobs_config: &JobsConfig) -> SchoolSettings {
    SchoolSettings {
        reminder_days_ahead: jobs_config.reminder_days_ahead,
        ..SchoolSettings::default()
    }
}

pub fn init_app_state(db: PgPool) -> AppState {
    let jobs_config = JobsConfig::from_env();
    let email_config = EmailConfig::from_env();

    let notifier: Arc<dyn Notifier> = if email_config.enabled {
        Arc::new(SmtpNotifier::new(email_config.clone()))
    } else {
        Arc::new(NoopNotifier)
    };

    let settings: Arc<dyn SettingsStore> =
        Arc::new(PgSettingsStore::new(db.clone(), settings_seed(&jobs_config)));

    AppState {
        db,
        jwt_config: JwtConfig::from_env(),
        email_config,
        cors_config: CorsConfig::from_env(),
        jobs_config,
        settings,
        notifier,
    }
}
