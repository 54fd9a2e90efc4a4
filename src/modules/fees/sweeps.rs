//! Time-triggered fee passes shared by the scheduler and the manual triggers.
//!
//! Each pass takes `today` explicitly. State changes commit per batch before
//! any guardian is notified, and a failed delivery only counts against the
//! report.

use anyhow::{Context, anyhow};
use chrono::{Datelike, Months, NaiveDate};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use schoolbase_core::AppError;
use schoolbase_models::fees::{days_overdue, total_due};
use schoolbase_models::ids::{InvoiceId, StudentId};
use schoolbase_models::{NotificationEvent, SchoolSettings};

use crate::metrics::track_sweep;
use crate::modules::fees::model::{OverdueInvoiceRow, SweepReport};
use crate::notifier::{Notifier, dispatch_notification};

const BATCH_SIZE: i64 = 200;

pub struct FeeSweeps;

impl FeeSweeps {
    /// Marks outstanding invoices past their due date as overdue, one
    /// committed batch at a time, and notifies guardians per transition.
    #[instrument(skip(db, notifier, settings))]
    pub async fn run_overdue_sweep(
        db: &PgPool,
        notifier: &dyn Notifier,
        settings: &SchoolSettings,
        today: NaiveDate,
    ) -> Result<SweepReport, AppError> {
        let mut report = SweepReport::default();

        loop {
            let mut tx = db.begin().await?;

            let rows = sqlx::query_as::<_, OverdueInvoiceRow>(
                r#"
                WITH batch AS (
                    SELECT id FROM fee_invoices
                    WHERE status IN ('unpaid', 'partial')
                      AND due_date < $1
                    ORDER BY due_date, id
                    LIMIT $2
                    FOR UPDATE SKIP LOCKED
                ), updated AS (
                    UPDATE fee_invoices i
                    SET status = 'overdue', updated_at = NOW()
                    FROM batch
                    WHERE i.id = batch.id
                    RETURNING i.id, i.student_id, i.term, i.amount, i.balance, i.status, i.due_date, i.late_fee
                )
                SELECT u.id, u.student_id, s.first_name || ' ' || s.last_name AS student_name,
                       u.term, u.amount, u.balance, u.status, u.due_date, u.late_fee
                FROM updated u
                JOIN students s ON s.id = u.student_id
                ORDER BY u.due_date, u.id
                "#,
            )
            .bind(today)
            .bind(BATCH_SIZE)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to mark overdue invoices")
            .map_err(AppError::database)?;

            tx.commit().await?;

            let batch_len = rows.len();
            for row in rows {
                let event = NotificationEvent::fee_overdue(
                    row.student_id,
                    &row.student_name,
                    row.id,
                    &row.term,
                    total_due(row.balance, row.late_fee),
                    days_overdue(row.due_date, today),
                    row.due_date,
                    &settings.currency,
                );
                report.processed += 1;
                if dispatch_notification(db, notifier, &event).await.failed > 0 {
                    report.failed += 1;
                }
            }

            if (batch_len as i64) < BATCH_SIZE {
                break;
            }
        }

        track_sweep("overdue", report.processed as u64, report.failed as u64);
        info!(processed = report.processed, failed = report.failed, "Overdue sweep finished");
        Ok(report)
    }

    /// Reminds guardians about invoices due exactly `reminder_days_ahead`
    /// days from `today`. Nothing is written, so a second run re-sends.
    #[instrument(skip(db, notifier, settings))]
    pub async fn run_reminder_sweep(
        db: &PgPool,
        notifier: &dyn Notifier,
        settings: &SchoolSettings,
        today: NaiveDate,
    ) -> Result<SweepReport, AppError> {
        let target = today + chrono::Duration::days(settings.reminder_days_ahead);

        let rows = sqlx::query_as::<_, OverdueInvoiceRow>(
            r#"
            SELECT i.id, i.student_id, s.first_name || ' ' || s.last_name AS student_name,
                   i.term, i.amount, i.balance, i.status, i.due_date, i.late_fee
            FROM fee_invoices i
            JOIN students s ON s.id = i.student_id
            WHERE i.status IN ('unpaid', 'partial')
              AND i.due_date = $1
            ORDER BY i.id
            "#,
        )
        .bind(target)
        .fetch_all(db)
        .await
        .context("Failed to fetch invoices due for a reminder")
        .map_err(AppError::database)?;

        let mut report = SweepReport::default();
        for row in rows {
            let event = NotificationEvent::fee_reminder(
                row.student_id,
                &row.student_name,
                row.id,
                &row.term,
                total_due(row.balance, row.late_fee),
                target,
                &settings.currency,
            );
            report.processed += 1;
            if dispatch_notification(db, notifier, &event).await.failed > 0 {
                report.failed += 1;
            }
        }

        track_sweep("reminders", report.processed as u64, report.failed as u64);
        info!(processed = report.processed, due_date = %target, "Reminder sweep finished");
        Ok(report)
    }

    /// Logs overdue invoices that carry a late fee and are past the grace
    /// period. The late fee stays a separate field; nothing is written.
    #[instrument(skip(db, settings))]
    pub async fn review_late_fees(
        db: &PgPool,
        settings: &SchoolSettings,
        today: NaiveDate,
    ) -> Result<SweepReport, AppError> {
        let cutoff = today - chrono::Duration::days(settings.late_fee_grace_days.max(0));

        let rows = sqlx::query_as::<_, (InvoiceId, StudentId, f64, f64, Option<NaiveDate>)>(
            r#"
            SELECT id, student_id, balance, late_fee, due_date
            FROM fee_invoices
            WHERE status = 'overdue'
              AND late_fee > 0
              AND due_date < $1
            ORDER BY due_date, id
            "#,
        )
        .bind(cutoff)
        .fetch_all(db)
        .await
        .context("Failed to fetch invoices past the late fee grace period")
        .map_err(AppError::database)?;

        for (invoice_id, student_id, balance, late_fee, due_date) in &rows {
            warn!(
                %invoice_id,
                %student_id,
                balance,
                late_fee,
                due_date = ?due_date,
                total_due = total_due(*balance, *late_fee),
                "Invoice past late fee grace period"
            );
        }

        let report = SweepReport {
            processed: rows.len(),
            failed: 0,
        };
        track_sweep("late_fees", report.processed as u64, 0);
        Ok(report)
    }

    /// On the first of the month, sends each student's guardians the totals
    /// for invoices raised during the previous month.
    #[instrument(skip(db, notifier, settings))]
    pub async fn run_monthly_statements(
        db: &PgPool,
        notifier: &dyn Notifier,
        settings: &SchoolSettings,
        today: NaiveDate,
    ) -> Result<SweepReport, AppError> {
        if today.day() != 1 {
            return Ok(SweepReport::default());
        }

        let start = today
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| AppError::internal(anyhow!("No month before {}", today)))?;
        let month = start.format("%Y-%m").to_string();

        let rows = sqlx::query_as::<_, (StudentId, String, f64, f64)>(
            r#"
            SELECT i.student_id, s.first_name || ' ' || s.last_name,
                   COALESCE(SUM(i.amount), 0), COALESCE(SUM(i.balance + i.late_fee), 0)
            FROM fee_invoices i
            JOIN students s ON s.id = i.student_id
            WHERE i.created_at::date >= $1
              AND i.created_at::date < $2
            GROUP BY i.student_id, s.first_name, s.last_name
            ORDER BY s.last_name, s.first_name
            "#,
        )
        .bind(start)
        .bind(today)
        .fetch_all(db)
        .await
        .context("Failed to build monthly statements")
        .map_err(AppError::database)?;

        let mut report = SweepReport::default();
        for (student_id, name, invoiced, outstanding) in rows {
            let event = NotificationEvent::monthly_statement(
                student_id,
                &name,
                &month,
                invoiced,
                outstanding,
                &settings.currency,
            );
            report.processed += 1;
            if dispatch_notification(db, notifier, &event).await.failed > 0 {
                report.failed += 1;
            }
        }

        track_sweep("monthly_statements", report.processed as u64, report.failed as u64);
        info!(month = %month, processed = report.processed, "Monthly statements sent");
        Ok(report)
    }
}
