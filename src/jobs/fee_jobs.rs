//! Scheduled passes over the fee ledger.
//!
//! Each job reads the current settings at run time, so changes made through
//! the settings endpoint apply from the next tick.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use schoolbase_core::AppError;

use super::scheduler::{Job, JobFrequency};
use crate::modules::fees::sweeps::FeeSweeps;
use crate::notifier::Notifier;
use crate::settings_store::SettingsStore;
use crate::state::AppState;

/// What every fee job needs from the application state.
#[derive(Clone)]
pub struct FeeJobContext {
    db: PgPool,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsStore>,
}

impl FeeJobContext {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            notifier: Arc::clone(&state.notifier),
            settings: Arc::clone(&state.settings),
        }
    }
}

pub struct OverdueSweepJob {
    ctx: FeeJobContext,
    frequency: JobFrequency,
}

impl OverdueSweepJob {
    pub fn new(ctx: FeeJobContext, interval_secs: u64) -> Self {
        Self {
            ctx,
            frequency: JobFrequency::from_secs(interval_secs),
        }
    }
}

#[async_trait::async_trait]
impl Job for OverdueSweepJob {
    fn name(&self) -> &'static str {
        "overdue_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<u64, AppError> {
        let settings = self.ctx.settings.current().await?.value;
        let today = Utc::now().date_naive();
        let report =
            FeeSweeps::run_overdue_sweep(&self.ctx.db, &*self.ctx.notifier, &settings, today).await?;
        Ok(report.processed as u64)
    }
}

pub struct ReminderSweepJob {
    ctx: FeeJobContext,
    frequency: JobFrequency,
}

impl ReminderSweepJob {
    pub fn new(ctx: FeeJobContext, interval_secs: u64) -> Self {
        Self {
            ctx,
            frequency: JobFrequency::from_secs(interval_secs),
        }
    }
}

#[async_trait::async_trait]
impl Job for ReminderSweepJob {
    fn name(&self) -> &'static str {
        "fee_reminder_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<u64, AppError> {
        let settings = self.ctx.settings.current().await?.value;
        let today = Utc::now().date_naive();
        let report =
            FeeSweeps::run_reminder_sweep(&self.ctx.db, &*self.ctx.notifier, &settings, today).await?;
        Ok(report.processed as u64)
    }
}

pub struct LateFeeReviewJob {
    ctx: FeeJobContext,
    frequency: JobFrequency,
}

impl LateFeeReviewJob {
    pub fn new(ctx: FeeJobContext, interval_secs: u64) -> Self {
        Self {
            ctx,
            frequency: JobFrequency::from_secs(interval_secs),
        }
    }
}

#[async_trait::async_trait]
impl Job for LateFeeReviewJob {
    fn name(&self) -> &'static str {
        "late_fee_review"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<u64, AppError> {
        let settings = self.ctx.settings.current().await?.value;
        let today = Utc::now().date_naive();
        let report = FeeSweeps::review_late_fees(&self.ctx.db, &settings, today).await?;
        Ok(report.processed as u64)
    }
}

/// Runs daily and only does work on the first of the month.
pub struct MonthlyStatementJob {
    ctx: FeeJobContext,
    frequency: JobFrequency,
}

impl MonthlyStatementJob {
    pub fn new(ctx: FeeJobContext, interval_secs: u64) -> Self {
        Self {
            ctx,
            frequency: JobFrequency::from_secs(interval_secs),
        }
    }
}

#[async_trait::async_trait]
impl Job for MonthlyStatementJob {
    fn name(&self) -> &'static str {
        "monthly_statements"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<u64, AppError> {
        let settings = self.ctx.settings.current().await?.value;
        let today = Utc::now().date_naive();
        let report =
            FeeSweeps::run_monthly_statements(&self.ctx.db, &*self.ctx.notifier, &settings, today)
                .await?;
        if report.processed > 0 {
            info!(students = report.processed, "Monthly statements sent");
        }
        Ok(report.processed as u64)
    }
}
