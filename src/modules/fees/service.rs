use std::collections::HashMap;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::ids::{FeeStructureId, InvoiceId, PaymentId, StudentId, UserId};
use schoolbase_models::{NotificationEvent, SchoolSettings};

use crate::metrics::{track_payment_recorded, track_waiver_applied};
use crate::modules::fees::model::{
    CreateFeeStructureDto, CreateInvoiceDto, CreateWaiverDto, FeeInvoice, FeePayment,
    FeeStructure, FeeStructureFilterParams, FeeWaiver, InvoiceDetail, InvoiceFilterParams,
    InvoiceStatus, Ledger, LedgerError, MyFees, OverdueInvoice, OverdueInvoiceRow, OverdueParams,
    PaymentReceipt, PaymentStatus, RecordPaymentDto, UpdateFeeStructureDto, UpdateInvoiceDto,
    WaiverFilterParams, WaiverWithStudent,
};
use crate::notifier::{Notifier, dispatch_notification};

pub(crate) const INVOICE_COLUMNS: &str =
    "id, student_id, term, amount, balance, status, due_date, late_fee, description, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, applied_amount, date, method, reference, status, recorded_by, created_at";

const WAIVER_COLUMNS: &str = "id, student_id, invoice_id, waiver_type, amount, percentage, applied_amount, reason, effective_date, status, approved_by, created_at";

const STRUCTURE_COLUMNS: &str = "id, name, class_name, term, tuition_fee, boarding_fee, activity_fee, exam_fee, other_fees, total_amount, is_active, created_at";

const DEFAULT_STUDENT_NAME: &str = "your child";

/// The payment is already committed, so a failed lookup only degrades the
/// notification text.
fn name_or_default(student_id: StudentId, lookup: Result<String, AppError>) -> String {
    lookup.unwrap_or_else(|e| {
        tracing::warn!(
            student_id = %student_id,
            error = %e.error,
            "Student name lookup failed; notifying with a generic name"
        );
        DEFAULT_STUDENT_NAME.to_string()
    })
}

fn ledger_error(e: LedgerError) -> AppError {
    match e {
        LedgerError::InvalidTransition { .. } => AppError::conflict(e),
        _ => AppError::unprocessable(e),
    }
}

fn invoice_not_found() -> AppError {
    AppError::not_found(anyhow!("Invoice not found"))
}

pub struct FeeService;

impl FeeService {
    #[instrument(skip(db, dto))]
    pub async fn create_invoice(db: &PgPool, dto: CreateInvoiceDto) -> Result<FeeInvoice, AppError> {
        let ledger = Ledger::open(dto.amount).map_err(ledger_error)?;

        let invoice = sqlx::query_as::<_, FeeInvoice>(&format!(
            r#"
            INSERT INTO fee_invoices (student_id, term, amount, balance, status, due_date, late_fee, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(dto.student_id)
        .bind(dto.term.trim())
        .bind(ledger.amount)
        .bind(ledger.balance)
        .bind(ledger.status)
        .bind(dto.due_date)
        .bind(dto.late_fee.unwrap_or(0.0))
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if schoolbase_db::is_foreign_key_violation(&e) {
                return AppError::not_found(anyhow!("Student not found"));
            }
            AppError::database(e)
        })?;

        tracing::info!(invoice_id = %invoice.id, student_id = %invoice.student_id, "Invoice created");
        Ok(invoice)
    }

    #[instrument(skip(db))]
    pub async fn list_invoices(
        db: &PgPool,
        filters: InvoiceFilterParams,
    ) -> Result<Paginated<FeeInvoice>, AppError> {
        let status = filters.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM fee_invoices
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::text IS NULL OR term = $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(filters.student_id)
        .bind(&filters.term)
        .bind(status)
        .fetch_one(db)
        .await
        .context("Failed to count invoices")
        .map_err(AppError::database)?;

        let invoices = sqlx::query_as::<_, FeeInvoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM fee_invoices
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::text IS NULL OR term = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filters.student_id)
        .bind(&filters.term)
        .bind(status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch invoices")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data: invoices,
            meta: filters.pagination.meta(total),
        })
    }

    pub(crate) async fn find_invoice(db: &PgPool, id: InvoiceId) -> Result<FeeInvoice, AppError> {
        sqlx::query_as::<_, FeeInvoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM fee_invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch invoice")
        .map_err(AppError::database)?
        .ok_or_else(invoice_not_found)
    }

    async fn lock_invoice(
        tx: &mut Transaction<'_, Postgres>,
        id: InvoiceId,
    ) -> Result<FeeInvoice, AppError> {
        sqlx::query_as::<_, FeeInvoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM fee_invoices WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to lock invoice")
        .map_err(AppError::database)?
        .ok_or_else(invoice_not_found)
    }

    async fn store_ledger(
        tx: &mut Transaction<'_, Postgres>,
        id: InvoiceId,
        ledger: &Ledger,
    ) -> Result<FeeInvoice, AppError> {
        sqlx::query_as::<_, FeeInvoice>(&format!(
            r#"
            UPDATE fee_invoices
            SET balance = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ledger.balance)
        .bind(ledger.status)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to update invoice balance")
        .map_err(AppError::database)
    }

    async fn payments_for(db: &PgPool, ids: &[InvoiceId]) -> Result<Vec<FeePayment>, AppError> {
        sqlx::query_as::<_, FeePayment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM fee_payments
            WHERE invoice_id = ANY($1)
            ORDER BY date, created_at, id
            "#
        ))
        .bind(ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch payments")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn get_invoice(db: &PgPool, id: InvoiceId) -> Result<InvoiceDetail, AppError> {
        let invoice = Self::find_invoice(db, id).await?;
        let payments = Self::payments_for(db, &[id]).await?;
        Ok(InvoiceDetail::new(invoice, payments))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_invoice(
        db: &PgPool,
        id: InvoiceId,
        dto: UpdateInvoiceDto,
    ) -> Result<FeeInvoice, AppError> {
        sqlx::query_as::<_, FeeInvoice>(&format!(
            r#"
            UPDATE fee_invoices
            SET due_date = COALESCE($2, due_date),
                description = COALESCE($3, description),
                late_fee = COALESCE($4, late_fee),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.due_date)
        .bind(&dto.description)
        .bind(dto.late_fee)
        .fetch_optional(db)
        .await
        .context("Failed to update invoice")
        .map_err(AppError::database)?
        .ok_or_else(invoice_not_found)
    }

    /// Refused once any payment exists. Deleting a missing invoice is a no-op.
    #[instrument(skip(db))]
    pub async fn delete_invoice(db: &PgPool, id: InvoiceId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let exists: Option<InvoiceId> =
            sqlx::query_scalar("SELECT id FROM fee_invoices WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock invoice")
                .map_err(AppError::database)?;

        if exists.is_none() {
            return Ok(());
        }

        let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fee_payments WHERE invoice_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count payments")
            .map_err(AppError::database)?;

        if payments > 0 {
            return Err(AppError::conflict(anyhow!(
                "Cannot delete an invoice with {} recorded payment(s)",
                payments
            )));
        }

        sqlx::query("DELETE FROM fee_invoices WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete invoice")
            .map_err(AppError::database)?;

        tx.commit().await?;
        tracing::info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    /// Debits the invoice under a row lock, then notifies guardians once the
    /// payment is committed.
    #[instrument(skip(db, notifier, settings, dto), fields(invoice_id = %dto.invoice_id))]
    pub async fn record_payment(
        db: &PgPool,
        notifier: &dyn Notifier,
        settings: &SchoolSettings,
        recorded_by: UserId,
        dto: RecordPaymentDto,
    ) -> Result<PaymentReceipt, AppError> {
        if let Some(method) = dto.method.as_deref() {
            if !settings.accepts_payment_method(method) {
                return Err(AppError::unprocessable(anyhow!(
                    "Unsupported payment method: {}",
                    method
                )));
            }
        }

        let status = dto.status.unwrap_or(PaymentStatus::Confirmed);
        if !status.counts_against_balance() {
            return Err(AppError::unprocessable(anyhow!(
                "A new payment must be pending or confirmed"
            )));
        }

        let mut tx = db.begin().await?;

        let invoice = Self::lock_invoice(&mut tx, dto.invoice_id).await?;
        let mut ledger = Ledger::from_invoice(&invoice);
        let applied = ledger.apply_payment(dto.amount).map_err(ledger_error)?;
        let invoice = Self::store_ledger(&mut tx, invoice.id, &ledger).await?;

        let payment = sqlx::query_as::<_, FeePayment>(&format!(
            r#"
            INSERT INTO fee_payments (invoice_id, amount, applied_amount, date, method, reference, status, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(invoice.id)
        .bind(dto.amount)
        .bind(applied)
        .bind(dto.date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(&dto.method)
        .bind(&dto.reference)
        .bind(status)
        .bind(recorded_by)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to record payment")
        .map_err(AppError::database)?;

        tx.commit().await?;

        track_payment_recorded(payment.method.as_deref().unwrap_or("unspecified"));
        tracing::info!(
            payment_id = %payment.id,
            amount = payment.amount,
            balance = invoice.balance,
            status = %invoice.status,
            "Payment recorded"
        );

        if status == PaymentStatus::Confirmed {
            let name = name_or_default(
                invoice.student_id,
                Self::student_name(db, invoice.student_id).await,
            );
            let event = NotificationEvent::payment_confirmed(
                invoice.student_id,
                &name,
                invoice.id,
                payment.amount,
                invoice.balance,
                &settings.currency,
            );
            dispatch_notification(db, notifier, &event).await;
        }

        Ok(PaymentReceipt {
            total_due: invoice.total_due(),
            payment,
            invoice,
        })
    }

    #[instrument(skip(db))]
    pub async fn list_payments(db: &PgPool, invoice_id: InvoiceId) -> Result<Vec<FeePayment>, AppError> {
        Self::find_invoice(db, invoice_id).await?;
        Self::payments_for(db, &[invoice_id]).await
    }

    /// Moving a counted payment to reversed or refunded hands the debit it
    /// applied back to the invoice exactly once.
    #[instrument(skip(db))]
    pub async fn update_payment_status(
        db: &PgPool,
        id: PaymentId,
        to: PaymentStatus,
    ) -> Result<PaymentReceipt, AppError> {
        let invoice_id: InvoiceId = sqlx::query_scalar("SELECT invoice_id FROM fee_payments WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch payment")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow!("Payment not found")))?;

        let mut tx = db.begin().await?;
        let mut invoice = Self::lock_invoice(&mut tx, invoice_id).await?;

        let payment = sqlx::query_as::<_, FeePayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM fee_payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock payment")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Payment not found")))?;

        let restores = payment.status.transition(to).map_err(ledger_error)?;

        if restores {
            let mut ledger = Ledger::from_invoice(&invoice);
            ledger.restore(payment.applied_amount);
            invoice = Self::store_ledger(&mut tx, invoice.id, &ledger).await?;
        }

        let payment = sqlx::query_as::<_, FeePayment>(&format!(
            "UPDATE fee_payments SET status = $2 WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update payment status")
        .map_err(AppError::database)?;

        tx.commit().await?;

        tracing::info!(payment_id = %id, status = %to, restored = restores, "Payment status changed");
        Ok(PaymentReceipt {
            total_due: invoice.total_due(),
            payment,
            invoice,
        })
    }

    /// Waivers are approved on creation. Only a waiver naming an invoice moves
    /// a balance.
    #[instrument(skip(db, dto), fields(student_id = %dto.student_id))]
    pub async fn create_waiver(
        db: &PgPool,
        approved_by: UserId,
        dto: CreateWaiverDto,
    ) -> Result<FeeWaiver, AppError> {
        let mut tx = db.begin().await?;

        let applied = match dto.invoice_id {
            Some(invoice_id) => {
                let invoice = Self::lock_invoice(&mut tx, invoice_id).await?;
                if invoice.student_id != dto.student_id {
                    return Err(AppError::unprocessable(anyhow!(
                        "Invoice does not belong to this student"
                    )));
                }
                let mut ledger = Ledger::from_invoice(&invoice);
                let applied = ledger
                    .apply_waiver(dto.amount, dto.percentage)
                    .map_err(ledger_error)?;
                Self::store_ledger(&mut tx, invoice.id, &ledger).await?;
                applied
            }
            None => {
                schoolbase_models::fees::waiver_reduction(0.0, dto.amount, dto.percentage)
                    .map_err(ledger_error)?;
                0.0
            }
        };

        let waiver = sqlx::query_as::<_, FeeWaiver>(&format!(
            r#"
            INSERT INTO fee_waivers
                (student_id, invoice_id, waiver_type, amount, percentage, applied_amount, reason, effective_date, status, approved_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'approved', $9)
            RETURNING {WAIVER_COLUMNS}
            "#
        ))
        .bind(dto.student_id)
        .bind(dto.invoice_id)
        .bind(dto.waiver_type.trim())
        .bind(dto.amount)
        .bind(dto.percentage)
        .bind(applied)
        .bind(&dto.reason)
        .bind(dto.effective_date)
        .bind(approved_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if schoolbase_db::is_foreign_key_violation(&e) {
                return AppError::not_found(anyhow!("Student not found"));
            }
            AppError::database(e)
        })?;

        tx.commit().await?;

        track_waiver_applied(waiver.invoice_id.is_some());
        tracing::info!(waiver_id = %waiver.id, applied_amount = applied, "Waiver applied");
        Ok(waiver)
    }

    #[instrument(skip(db))]
    pub async fn list_waivers(
        db: &PgPool,
        filters: WaiverFilterParams,
    ) -> Result<Vec<WaiverWithStudent>, AppError> {
        let waivers = sqlx::query_as::<_, WaiverWithStudent>(
            r#"
            SELECT w.id, w.student_id, w.invoice_id, w.waiver_type, w.amount, w.percentage,
                   w.applied_amount, w.reason, w.effective_date, w.status, w.approved_by, w.created_at,
                   s.first_name || ' ' || s.last_name AS student_name
            FROM fee_waivers w
            JOIN students s ON s.id = w.student_id
            WHERE ($1::uuid IS NULL OR w.student_id = $1)
              AND ($2::text IS NULL OR w.status = $2)
            ORDER BY w.created_at DESC, w.id
            "#,
        )
        .bind(filters.student_id)
        .bind(&filters.status)
        .fetch_all(db)
        .await
        .context("Failed to fetch waivers")
        .map_err(AppError::database)?;

        Ok(waivers)
    }

    #[instrument(skip(db, dto))]
    pub async fn create_fee_structure(
        db: &PgPool,
        dto: CreateFeeStructureDto,
    ) -> Result<FeeStructure, AppError> {
        let structure = sqlx::query_as::<_, FeeStructure>(&format!(
            r#"
            INSERT INTO fee_structures
                (name, class_name, term, tuition_fee, boarding_fee, activity_fee, exam_fee, other_fees, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STRUCTURE_COLUMNS}
            "#
        ))
        .bind(dto.name.trim())
        .bind(dto.class_name.trim())
        .bind(dto.term.trim())
        .bind(dto.tuition_fee)
        .bind(dto.boarding_fee)
        .bind(dto.activity_fee)
        .bind(dto.exam_fee)
        .bind(dto.other_fees)
        .bind(dto.total())
        .fetch_one(db)
        .await
        .context("Failed to create fee structure")
        .map_err(AppError::database)?;

        Ok(structure)
    }

    #[instrument(skip(db))]
    pub async fn list_fee_structures(
        db: &PgPool,
        filters: FeeStructureFilterParams,
    ) -> Result<Vec<FeeStructure>, AppError> {
        let structures = sqlx::query_as::<_, FeeStructure>(&format!(
            r#"
            SELECT {STRUCTURE_COLUMNS}
            FROM fee_structures
            WHERE ($1::text IS NULL OR class_name = $1)
              AND ($2::text IS NULL OR term = $2)
              AND ($3::boolean IS NULL OR is_active = $3)
            ORDER BY class_name, term, name
            "#
        ))
        .bind(&filters.class_name)
        .bind(&filters.term)
        .bind(filters.is_active)
        .fetch_all(db)
        .await
        .context("Failed to fetch fee structures")
        .map_err(AppError::database)?;

        Ok(structures)
    }

    #[instrument(skip(db))]
    pub async fn get_fee_structure(db: &PgPool, id: FeeStructureId) -> Result<FeeStructure, AppError> {
        sqlx::query_as::<_, FeeStructure>(&format!(
            "SELECT {STRUCTURE_COLUMNS} FROM fee_structures WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch fee structure")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Fee structure not found")))
    }

    /// The total is recomputed from the merged components.
    #[instrument(skip(db, dto))]
    pub async fn update_fee_structure(
        db: &PgPool,
        id: FeeStructureId,
        dto: UpdateFeeStructureDto,
    ) -> Result<FeeStructure, AppError> {
        let mut structure = Self::get_fee_structure(db, id).await?;
        dto.apply(&mut structure);

        sqlx::query_as::<_, FeeStructure>(&format!(
            r#"
            UPDATE fee_structures
            SET name = $2, tuition_fee = $3, boarding_fee = $4, activity_fee = $5,
                exam_fee = $6, other_fees = $7, total_amount = $8, is_active = $9
            WHERE id = $1
            RETURNING {STRUCTURE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&structure.name)
        .bind(structure.tuition_fee)
        .bind(structure.boarding_fee)
        .bind(structure.activity_fee)
        .bind(structure.exam_fee)
        .bind(structure.other_fees)
        .bind(structure.total_amount)
        .bind(structure.is_active)
        .fetch_optional(db)
        .await
        .context("Failed to update fee structure")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Fee structure not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_fee_structure(db: &PgPool, id: FeeStructureId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM fee_structures WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete fee structure")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Fee structure not found")));
        }
        Ok(())
    }

    /// Outstanding invoices at least `days_overdue` days past due.
    #[instrument(skip(db, settings))]
    pub async fn list_overdue(
        db: &PgPool,
        settings: &SchoolSettings,
        params: OverdueParams,
        today: NaiveDate,
    ) -> Result<Vec<OverdueInvoice>, AppError> {
        let min_days = params
            .days_overdue
            .unwrap_or(settings.overdue_threshold_days)
            .max(1);

        let rows = sqlx::query_as::<_, OverdueInvoiceRow>(
            r#"
            SELECT i.id, i.student_id, s.first_name || ' ' || s.last_name AS student_name,
                   i.term, i.amount, i.balance, i.status, i.due_date, i.late_fee
            FROM fee_invoices i
            JOIN students s ON s.id = i.student_id
            WHERE i.status = ANY($1)
              AND i.due_date IS NOT NULL
              AND ($2::date - i.due_date) >= $3::bigint
              AND ($4::text IS NULL OR i.term = $4)
            ORDER BY i.due_date, i.id
            "#,
        )
        .bind(outstanding_statuses())
        .bind(today)
        .bind(min_days)
        .bind(&params.term)
        .fetch_all(db)
        .await
        .context("Failed to fetch overdue invoices")
        .map_err(AppError::database)?;

        Ok(rows.into_iter().map(|row| OverdueInvoice::new(row, today)).collect())
    }

    #[instrument(skip(db))]
    pub async fn my_fees(db: &PgPool, student_id: StudentId) -> Result<MyFees, AppError> {
        let invoices = sqlx::query_as::<_, FeeInvoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM fee_invoices
            WHERE student_id = $1
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(student_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch invoices")
        .map_err(AppError::database)?;

        let ids: Vec<InvoiceId> = invoices.iter().map(|i| i.id).collect();
        let mut by_invoice: HashMap<InvoiceId, Vec<FeePayment>> = HashMap::new();
        for payment in Self::payments_for(db, &ids).await? {
            by_invoice.entry(payment.invoice_id).or_default().push(payment);
        }

        let details = invoices
            .into_iter()
            .map(|invoice| {
                let payments = by_invoice.remove(&invoice.id).unwrap_or_default();
                InvoiceDetail::new(invoice, payments)
            })
            .collect();

        Ok(MyFees::new(student_id, details))
    }

    pub(crate) async fn student_name(db: &PgPool, id: StudentId) -> Result<String, AppError> {
        let name: Option<String> =
            sqlx::query_scalar("SELECT first_name || ' ' || last_name FROM students WHERE id = $1")
                .bind(id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch student name")
                .map_err(AppError::database)?;

        Ok(name.unwrap_or_else(|| DEFAULT_STUDENT_NAME.to_string()))
    }
}

/// Statuses the overdue sweep may act on, plus already-overdue invoices for listing.
fn outstanding_statuses() -> Vec<&'static str> {
    [InvoiceStatus::Unpaid, InvoiceStatus::Partial, InvoiceStatus::Overdue]
        .iter()
        .map(InvoiceStatus::as_str)
        .collect()
}
