//! Fee ledger: invoices, payments, waivers and fee structures.
//!
//! # Invoice state machine
//!
//! ```text
//!            payment/waiver            payment/waiver
//!   unpaid ─────────────────▶ partial ─────────────────▶ paid
//!     │                          │
//!     └──── overdue sweep ───────┴────▶ overdue
//! ```
//!
//! `status` is derived from `balance` against `amount` by [`derive_status`]
//! after every debit or restore. Only the overdue sweep sets `overdue`; a later
//! debit re-derives the status and the next sweep re-marks it if still late.
//!
//! `balance` never includes the late fee. The amount payable is always
//! [`total_due`] = `balance + late_fee`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use schoolbase_core::PaginationParams;
use schoolbase_core::serde::empty_string_as_none;

use crate::ids::{FeeStructureId, InvoiceId, PaymentId, StudentId, UserId, WaiverId};
use crate::text_enum::impl_text_enum;

/// Balances within half a cent of zero are treated as settled.
const EPSILON: f64 = 0.005;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("percentage must be between 0 and 100")]
    InvalidPercentage,
    #[error("waiver needs a positive amount or percentage")]
    EmptyWaiver,
    #[error("cannot change payment status from {from} to {to}")]
    InvalidTransition { from: PaymentStatus, to: PaymentStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    /// Statuses the overdue and reminder sweeps act on.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::Partial)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(format!("invalid invoice status: {other}")),
        }
    }
}

impl_text_enum!(InvoiceStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Reversed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Reversed => "reversed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Pending and confirmed payments count against the invoice balance.
    pub fn counts_against_balance(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Confirmed)
    }

    /// Validates a status change and reports whether it restores the balance.
    ///
    /// Reversed and refunded are terminal. Moving a counted payment to either
    /// of them hands its amount back to the invoice exactly once.
    pub fn transition(self, to: PaymentStatus) -> Result<bool, LedgerError> {
        if self == to {
            return Ok(false);
        }
        if !self.counts_against_balance() {
            return Err(LedgerError::InvalidTransition { from: self, to });
        }
        Ok(!to.counts_against_balance())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            "reversed" => Ok(PaymentStatus::Reversed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("invalid payment status: {other}")),
        }
    }
}

impl_text_enum!(PaymentStatus);

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `paid` at zero, `partial` below the original amount, `unpaid` otherwise.
pub fn derive_status(balance: f64, amount: f64) -> InvoiceStatus {
    if balance <= EPSILON {
        InvoiceStatus::Paid
    } else if balance < amount - EPSILON {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Unpaid
    }
}

pub fn total_due(balance: f64, late_fee: f64) -> f64 {
    round_cents(balance + late_fee)
}

/// The mutable part of an invoice, with the ledger transitions applied to it.
///
/// Every transition keeps `0 <= balance <= amount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ledger {
    pub amount: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
}

impl Ledger {
    pub fn open(amount: f64) -> Result<Self, LedgerError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(LedgerError::NonPositiveAmount);
        }
        Ok(Self {
            amount,
            balance: amount,
            status: InvoiceStatus::Unpaid,
        })
    }

    pub fn from_invoice(invoice: &FeeInvoice) -> Self {
        Self {
            amount: invoice.amount,
            balance: invoice.balance,
            status: invoice.status,
        }
    }

    /// Takes `amount` off the balance and returns what was actually removed.
    fn debit(&mut self, amount: f64) -> f64 {
        let before = self.balance;
        self.balance = round_cents((self.balance - amount).max(0.0));
        self.status = derive_status(self.balance, self.amount);
        round_cents(before - self.balance)
    }

    /// Applies a payment and returns the part of it that reduced the balance.
    /// An overpayment only debits what was still owed.
    pub fn apply_payment(&mut self, amount: f64) -> Result<f64, LedgerError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(LedgerError::NonPositiveAmount);
        }
        Ok(self.debit(amount))
    }

    /// Applies a waiver and returns the amount actually taken off.
    ///
    /// A positive flat `amount` wins; otherwise `percentage` of the current
    /// balance is waived.
    pub fn apply_waiver(&mut self, amount: f64, percentage: f64) -> Result<f64, LedgerError> {
        let reduction = waiver_reduction(self.balance, amount, percentage)?;
        Ok(self.debit(reduction))
    }

    /// Hands a reversed or refunded payment's applied debit back to the
    /// balance, capped at the original amount.
    pub fn restore(&mut self, amount: f64) {
        self.balance = round_cents((self.balance + amount.max(0.0)).min(self.amount));
        self.status = derive_status(self.balance, self.amount);
    }
}

/// How much a waiver takes off `balance`.
pub fn waiver_reduction(balance: f64, amount: f64, percentage: f64) -> Result<f64, LedgerError> {
    if !(0.0..=100.0).contains(&percentage) {
        return Err(LedgerError::InvalidPercentage);
    }
    if amount < 0.0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    if amount > 0.0 {
        Ok(amount)
    } else if percentage > 0.0 {
        Ok(round_cents(balance * percentage / 100.0))
    } else {
        Err(LedgerError::EmptyWaiver)
    }
}

/// Outstanding and past due as of `today`.
pub fn is_overdue(status: InvoiceStatus, due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    status.is_outstanding() && due_date.is_some_and(|due| due < today)
}

/// Outstanding and due exactly `days_ahead` days after `today`.
pub fn is_reminder_due(
    status: InvoiceStatus,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
    days_ahead: i64,
) -> bool {
    status.is_outstanding()
        && due_date.is_some_and(|due| (due - today).num_days() == days_ahead)
}

pub fn days_overdue(due_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    due_date.map(|due| (today - due).num_days().max(0)).unwrap_or(0)
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct FeeInvoice {
    pub id: InvoiceId,
    pub student_id: StudentId,
    pub term: String,
    pub amount: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub late_fee: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeeInvoice {
    pub fn total_due(&self) -> f64 {
        total_due(self.balance, self.late_fee)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: FeeInvoice,
    pub total_due: f64,
    pub payments: Vec<FeePayment>,
}

impl InvoiceDetail {
    pub fn new(invoice: FeeInvoice, payments: Vec<FeePayment>) -> Self {
        Self {
            total_due: invoice.total_due(),
            invoice,
            payments,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceDto {
    pub student_id: StudentId,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "2024-T1")]
    pub term: String,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub late_fee: Option<f64>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Editable invoice fields. Amount and balance only move through the ledger.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateInvoiceDto {
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub late_fee: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct InvoiceFilterParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub student_id: Option<StudentId>,
    pub term: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub status: Option<InvoiceStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct FeePayment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: f64,
    pub date: NaiveDate,
    pub method: Option<String>,
    pub reference: Option<String>,
    /// The part of `amount` that reduced the invoice balance.
    pub applied_amount: f64,
    pub status: PaymentStatus,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentDto {
    pub invoice_id: InvoiceId,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    #[validate(length(max = 50))]
    #[schema(example = "M-Pesa")]
    pub method: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    /// `pending` or `confirmed` (default).
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusDto {
    pub status: PaymentStatus,
}

/// A payment together with the invoice state it left behind.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub payment: FeePayment,
    pub invoice: FeeInvoice,
    pub total_due: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct FeeWaiver {
    pub id: WaiverId,
    pub student_id: StudentId,
    pub invoice_id: Option<InvoiceId>,
    pub waiver_type: String,
    pub amount: f64,
    pub percentage: f64,
    /// What was actually taken off the invoice balance, if one was named.
    pub applied_amount: f64,
    pub reason: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub status: String,
    pub approved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWaiverDto {
    pub student_id: StudentId,
    pub invoice_id: Option<InvoiceId>,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "bursary")]
    pub waiver_type: String,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub amount: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub percentage: f64,
    pub reason: Option<String>,
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct WaiverFilterParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub student_id: Option<StudentId>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct WaiverWithStudent {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub waiver: FeeWaiver,
    pub student_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct FeeStructure {
    pub id: FeeStructureId,
    pub name: String,
    pub class_name: String,
    pub term: String,
    pub tuition_fee: f64,
    pub boarding_fee: f64,
    pub activity_fee: f64,
    pub exam_fee: f64,
    pub other_fees: f64,
    pub total_amount: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFeeStructureDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub class_name: String,
    #[validate(length(min = 1, max = 50))]
    pub term: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub tuition_fee: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub boarding_fee: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub activity_fee: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub exam_fee: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub other_fees: f64,
}

impl CreateFeeStructureDto {
    pub fn total(&self) -> f64 {
        round_cents(
            self.tuition_fee + self.boarding_fee + self.activity_fee + self.exam_fee + self.other_fees,
        )
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFeeStructureDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0.0))]
    pub tuition_fee: Option<f64>,
    #[validate(range(min = 0.0))]
    pub boarding_fee: Option<f64>,
    #[validate(range(min = 0.0))]
    pub activity_fee: Option<f64>,
    #[validate(range(min = 0.0))]
    pub exam_fee: Option<f64>,
    #[validate(range(min = 0.0))]
    pub other_fees: Option<f64>,
    pub is_active: Option<bool>,
}

impl UpdateFeeStructureDto {
    /// Applies the patch and recomputes the total.
    pub fn apply(&self, s: &mut FeeStructure) {
        if let Some(name) = &self.name {
            s.name = name.clone();
        }
        s.tuition_fee = self.tuition_fee.unwrap_or(s.tuition_fee);
        s.boarding_fee = self.boarding_fee.unwrap_or(s.boarding_fee);
        s.activity_fee = self.activity_fee.unwrap_or(s.activity_fee);
        s.exam_fee = self.exam_fee.unwrap_or(s.exam_fee);
        s.other_fees = self.other_fees.unwrap_or(s.other_fees);
        s.is_active = self.is_active.unwrap_or(s.is_active);
        s.total_amount = round_cents(
            s.tuition_fee + s.boarding_fee + s.activity_fee + s.exam_fee + s.other_fees,
        );
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct FeeStructureFilterParams {
    pub class_name: Option<String>,
    pub term: Option<String>,
    #[serde(default = "default_active", deserialize_with = "active_flag")]
    #[param(value_type = Option<bool>)]
    pub is_active: Option<bool>,
}

impl Default for FeeStructureFilterParams {
    fn default() -> Self {
        Self {
            class_name: None,
            term: None,
            is_active: default_active(),
        }
    }
}

fn default_active() -> Option<bool> {
    Some(true)
}

/// `?is_active=` (blank) lists everything; absent lists active only.
fn active_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    empty_string_as_none(deserializer)
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct OverdueParams {
    pub term: Option<String>,
    /// Minimum days past due. Defaults to the configured overdue threshold.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i64>)]
    pub days_overdue: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct OverdueInvoiceRow {
    pub id: InvoiceId,
    pub student_id: StudentId,
    pub student_name: String,
    pub term: String,
    pub amount: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub late_fee: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueInvoice {
    #[serde(flatten)]
    pub row: OverdueInvoiceRow,
    pub days_overdue: i64,
    pub total_due: f64,
}

impl OverdueInvoice {
    pub fn new(row: OverdueInvoiceRow, today: NaiveDate) -> Self {
        Self {
            days_overdue: days_overdue(row.due_date, today),
            total_due: total_due(row.balance, row.late_fee),
            row,
        }
    }
}

/// Outcome of a batch sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Invoices transitioned (overdue) or reminded (reminders).
    pub processed: usize,
    /// Rows skipped after a per-row failure.
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyFees {
    pub student_id: StudentId,
    pub invoices: Vec<InvoiceDetail>,
    pub total_balance: f64,
    pub total_due: f64,
}

impl MyFees {
    pub fn new(student_id: StudentId, invoices: Vec<InvoiceDetail>) -> Self {
        let total_balance = round_cents(invoices.iter().map(|i| i.invoice.balance).sum());
        let total_due = round_cents(invoices.iter().map(|i| i.total_due).sum());
        Self {
            student_id,
            invoices,
            total_balance,
            total_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(amount: f64) -> Ledger {
        Ledger::open(amount).unwrap()
    }

    #[test]
    fn test_open_sets_full_balance() {
        let l = ledger(100.0);
        assert_eq!(l.balance, 100.0);
        assert_eq!(l.status, InvoiceStatus::Unpaid);
        assert_eq!(Ledger::open(0.0), Err(LedgerError::NonPositiveAmount));
    }

    #[test]
    fn test_payments_are_associative() {
        let mut split = ledger(100.0);
        split.apply_payment(30.0).unwrap();
        split.apply_payment(20.0).unwrap();

        let mut single = ledger(100.0);
        single.apply_payment(50.0).unwrap();

        assert_eq!(split, single);
        assert_eq!(split.balance, 50.0);
        assert_eq!(split.status, InvoiceStatus::Partial);
    }

    #[test]
    fn test_status_derivation_boundaries() {
        assert_eq!(derive_status(0.0, 100.0), InvoiceStatus::Paid);
        assert_eq!(derive_status(0.01, 100.0), InvoiceStatus::Partial);
        assert_eq!(derive_status(99.99, 100.0), InvoiceStatus::Partial);
        assert_eq!(derive_status(100.0, 100.0), InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_overpayment_clamps_to_zero() {
        let mut l = ledger(100.0);
        l.apply_payment(250.0).unwrap();
        assert_eq!(l.balance, 0.0);
        assert_eq!(l.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_balance_stays_in_range_over_mixed_sequence() {
        let mut l = ledger(120.0);
        let steps: [(&str, f64, f64); 6] = [
            ("pay", 10.0, 0.0),
            ("waive", 0.0, 25.0),
            ("pay", 0.33, 0.0),
            ("waive", 5.0, 0.0),
            ("pay", 500.0, 0.0),
            ("waive", 0.0, 100.0),
        ];
        for (kind, amount, pct) in steps {
            match kind {
                "pay" => {
                    l.apply_payment(amount).unwrap();
                }
                _ => {
                    let _ = l.apply_waiver(amount, pct);
                }
            }
            assert!(l.balance >= 0.0 && l.balance <= l.amount, "balance {} out of range", l.balance);
        }
        assert_eq!(l.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_payment_rejects_non_positive() {
        let mut l = ledger(100.0);
        assert_eq!(l.apply_payment(0.0), Err(LedgerError::NonPositiveAmount));
        assert_eq!(l.apply_payment(-5.0), Err(LedgerError::NonPositiveAmount));
        assert_eq!(l.balance, 100.0);
    }

    #[test]
    fn test_waiver_flat_amount_wins() {
        let mut l = ledger(200.0);
        let taken = l.apply_waiver(50.0, 90.0).unwrap();
        assert_eq!(taken, 50.0);
        assert_eq!(l.balance, 150.0);
        assert_eq!(l.status, InvoiceStatus::Partial);
    }

    #[test]
    fn test_waiver_percentage_of_remaining_balance() {
        let mut l = ledger(200.0);
        l.apply_payment(100.0).unwrap();
        let taken = l.apply_waiver(0.0, 10.0).unwrap();
        assert_eq!(taken, 10.0);
        assert_eq!(l.balance, 90.0);
    }

    #[test]
    fn test_waiver_reports_clamped_amount() {
        let mut l = ledger(40.0);
        assert_eq!(l.apply_waiver(100.0, 0.0).unwrap(), 40.0);
        assert_eq!(l.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_waiver_validation() {
        assert_eq!(waiver_reduction(100.0, 0.0, 0.0), Err(LedgerError::EmptyWaiver));
        assert_eq!(waiver_reduction(100.0, 0.0, 101.0), Err(LedgerError::InvalidPercentage));
        assert_eq!(waiver_reduction(100.0, -1.0, 0.0), Err(LedgerError::NonPositiveAmount));
    }

    #[test]
    fn test_restore_caps_at_amount() {
        let mut l = ledger(100.0);
        l.apply_payment(30.0).unwrap();
        l.restore(30.0);
        assert_eq!(l.balance, 100.0);
        assert_eq!(l.status, InvoiceStatus::Unpaid);
        l.restore(30.0);
        assert_eq!(l.balance, 100.0);
    }

    #[test]
    fn test_overpayment_reports_only_what_was_owed() {
        let mut l = ledger(100.0);
        assert_eq!(l.apply_payment(70.0).unwrap(), 70.0);
        let applied = l.apply_payment(50.0).unwrap();
        assert_eq!(applied, 30.0);
        assert_eq!(l.balance, 0.0);

        l.restore(applied);
        assert_eq!(l.balance, 30.0);
        assert_eq!(l.status, InvoiceStatus::Partial);
    }

    #[test]
    fn test_payment_status_transitions() {
        use PaymentStatus::*;
        assert_eq!(Confirmed.transition(Reversed), Ok(true));
        assert_eq!(Pending.transition(Refunded), Ok(true));
        assert_eq!(Pending.transition(Confirmed), Ok(false));
        assert_eq!(Confirmed.transition(Confirmed), Ok(false));
        assert!(Reversed.transition(Confirmed).is_err());
        assert!(Refunded.transition(Reversed).is_err());
    }

    #[test]
    fn test_overdue_eligibility() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = today.pred_opt();
        assert!(is_overdue(InvoiceStatus::Unpaid, yesterday, today));
        assert!(is_overdue(InvoiceStatus::Partial, yesterday, today));
        assert!(!is_overdue(InvoiceStatus::Overdue, yesterday, today));
        assert!(!is_overdue(InvoiceStatus::Paid, yesterday, today));
        assert!(!is_overdue(InvoiceStatus::Unpaid, Some(today), today));
        assert!(!is_overdue(InvoiceStatus::Unpaid, None, today));
    }

    #[test]
    fn test_reminder_exactly_n_days_ahead() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 5, 13);
        assert!(is_reminder_due(InvoiceStatus::Unpaid, due, today, 3));
        assert!(!is_reminder_due(InvoiceStatus::Unpaid, due, today, 2));
        assert!(!is_reminder_due(InvoiceStatus::Paid, due, today, 3));
        assert!(!is_reminder_due(InvoiceStatus::Overdue, due, today, 3));
    }

    #[test]
    fn test_total_due_adds_late_fee() {
        assert_eq!(total_due(150.0, 25.5), 175.5);
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(days_overdue(NaiveDate::from_ymd_opt(2024, 5, 1), today), 9);
        assert_eq!(days_overdue(None, today), 0);
    }

    #[test]
    fn test_fee_structure_total() {
        let dto: CreateFeeStructureDto = serde_json::from_str(
            r#"{"name":"Form 1 boarding","class_name":"Form 1","term":"T1","tuition_fee":1000,"boarding_fee":500.5,"exam_fee":20}"#,
        )
        .unwrap();
        assert_eq!(dto.total(), 1520.5);
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(serde_json::to_string(&InvoiceStatus::Overdue).unwrap(), r#""overdue""#);
        let s: PaymentStatus = serde_json::from_str(r#""refunded""#).unwrap();
        assert_eq!(s, PaymentStatus::Refunded);
    }
}
