//! Deletes read notifications past the retention window.

use sqlx::PgPool;
use tracing::info;

use schoolbase_core::AppError;

use super::scheduler::{Job, JobFrequency};
use crate::modules::notifications::service::NotificationService;

const DEFAULT_RETENTION_DAYS: i64 = 90;

pub struct NotificationRetentionJob {
    db: PgPool,
    retention_days: i64,
}

impl NotificationRetentionJob {
    pub fn new(db: PgPool, retention_days: Option<i64>) -> Self {
        Self {
            db,
            retention_days: retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
        }
    }
}

#[async_trait::async_trait]
impl Job for NotificationRetentionJob {
    fn name(&self) -> &'static str {
        "notification_retention"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<u64, AppError> {
        let deleted =
            NotificationService::purge_read_older_than(&self.db, self.retention_days).await?;
        info!(deleted, retention_days = self.retention_days, "Purged read notifications");
        Ok(deleted)
    }
}
