//! Background job scheduler and the jobs the server registers.

mod fee_jobs;
mod notification_retention;
pub mod scheduler;

pub use fee_jobs::{
    FeeJobContext, LateFeeReviewJob, MonthlyStatementJob, OverdueSweepJob, ReminderSweepJob,
};
pub use notification_retention::NotificationRetentionJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};

use crate::state::AppState;

/// Registers every background job against `state`. The caller starts it.
pub fn build_scheduler(state: &AppState) -> JobScheduler {
    let ctx = FeeJobContext::from_state(state);
    let config = &state.jobs_config;

    let mut scheduler = JobScheduler::new();
    scheduler.register(OverdueSweepJob::new(ctx.clone(), config.overdue_interval_secs));
    scheduler.register(ReminderSweepJob::new(ctx.clone(), config.daily_interval_secs));
    scheduler.register(LateFeeReviewJob::new(ctx.clone(), config.daily_interval_secs));
    scheduler.register(MonthlyStatementJob::new(ctx, config.daily_interval_secs));
    scheduler.register(NotificationRetentionJob::new(state.db.clone(), None));
    scheduler
}
