//! In-app notifications, per-user preferences and the events that produce them.
//!
//! Gating lives in [`should_send`]. Without a preference row everything is
//! sent on every channel. With one, the type toggle and (for external
//! channels) the channel toggle must both be on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};

use schoolbase_core::serde::empty_string_as_none;

use crate::attendance::AttendanceStatus;
use crate::discipline::{CaseStatus, is_high_severity};
use crate::ids::{CaseId, InvoiceId, NotificationId, StudentId, UserId};
use crate::text_enum::impl_text_enum;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    GradeUpdated,
    AttendanceMarked,
    /// Upcoming, overdue and monthly statement notices.
    FeeReminder,
    FeePaymentConfirmed,
    DisciplinaryCase,
    TimetableUpdated,
    GeneralAnnouncement,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::GradeUpdated => "grade_updated",
            NotificationType::AttendanceMarked => "attendance_marked",
            NotificationType::FeeReminder => "fee_reminder",
            NotificationType::FeePaymentConfirmed => "fee_payment_confirmed",
            NotificationType::DisciplinaryCase => "disciplinary_case",
            NotificationType::TimetableUpdated => "timetable_updated",
            NotificationType::GeneralAnnouncement => "general_announcement",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "grade_updated" => Ok(NotificationType::GradeUpdated),
            "attendance_marked" => Ok(NotificationType::AttendanceMarked),
            "fee_reminder" => Ok(NotificationType::FeeReminder),
            "fee_payment_confirmed" => Ok(NotificationType::FeePaymentConfirmed),
            "disciplinary_case" => Ok(NotificationType::DisciplinaryCase),
            "timetable_updated" => Ok(NotificationType::TimetableUpdated),
            "general_announcement" => Ok(NotificationType::GeneralAnnouncement),
            other => Err(format!("invalid notification type: {other}")),
        }
    }
}

impl_text_enum!(NotificationType);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub data: Json<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, ToSchema)]
pub struct NotificationPreference {
    pub user_id: UserId,
    pub grade_updated: bool,
    pub attendance_marked: bool,
    pub fee_reminder: bool,
    pub fee_payment_confirmed: bool,
    pub disciplinary_case: bool,
    pub timetable_updated: bool,
    pub general_announcement: bool,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub push_enabled: bool,
}

impl NotificationPreference {
    /// What a user gets before saving preferences: everything except
    /// timetable changes and SMS.
    pub fn defaults(user_id: UserId) -> Self {
        Self {
            user_id,
            grade_updated: true,
            attendance_marked: true,
            fee_reminder: true,
            fee_payment_confirmed: true,
            disciplinary_case: true,
            timetable_updated: false,
            general_announcement: true,
            email_enabled: true,
            sms_enabled: false,
            push_enabled: true,
        }
    }

    pub fn type_enabled(&self, kind: NotificationType) -> bool {
        match kind {
            NotificationType::GradeUpdated => self.grade_updated,
            NotificationType::AttendanceMarked => self.attendance_marked,
            NotificationType::FeeReminder => self.fee_reminder,
            NotificationType::FeePaymentConfirmed => self.fee_payment_confirmed,
            NotificationType::DisciplinaryCase => self.disciplinary_case,
            NotificationType::TimetableUpdated => self.timetable_updated,
            NotificationType::GeneralAnnouncement => self.general_announcement,
        }
    }

    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::InApp => true,
            Channel::Email => self.email_enabled,
            Channel::Sms => self.sms_enabled,
            Channel::Push => self.push_enabled,
        }
    }
}

/// Whether `kind` may be delivered on `channel` under the stored preferences.
pub fn should_send(
    preference: Option<&NotificationPreference>,
    kind: NotificationType,
    channel: Channel,
) -> bool {
    match preference {
        None => true,
        Some(p) => p.type_enabled(kind) && p.channel_enabled(channel),
    }
}

/// Partial preference update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PreferencesUpdate {
    pub grade_updated: Option<bool>,
    pub attendance_marked: Option<bool>,
    pub fee_reminder: Option<bool>,
    pub fee_payment_confirmed: Option<bool>,
    pub disciplinary_case: Option<bool>,
    pub timetable_updated: Option<bool>,
    pub general_announcement: Option<bool>,
    pub email_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(&self, p: &mut NotificationPreference) {
        let fields = [
            (self.grade_updated, &mut p.grade_updated),
            (self.attendance_marked, &mut p.attendance_marked),
            (self.fee_reminder, &mut p.fee_reminder),
            (self.fee_payment_confirmed, &mut p.fee_payment_confirmed),
            (self.disciplinary_case, &mut p.disciplinary_case),
            (self.timetable_updated, &mut p.timetable_updated),
            (self.general_announcement, &mut p.general_announcement),
            (self.email_enabled, &mut p.email_enabled),
            (self.sms_enabled, &mut p.sms_enabled),
            (self.push_enabled, &mut p.push_enabled),
        ];
        for (value, slot) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct NotificationListParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<bool>)]
    pub unread_only: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i64>, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i64>)]
    pub offset: Option<i64>,
}

impl NotificationListParams {
    pub fn unread_only(&self) -> bool {
        self.unread_only.unwrap_or(false)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

/// A student-scoped domain event, rendered once and fanned out to guardians.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub student_id: StudentId,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    /// Whether the event also warrants an email, before preferences.
    pub email: bool,
}

fn money(currency: &str, amount: f64) -> String {
    let total_cents = (amount.abs() * 100.0).round() as i64;
    let digits = (total_cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{:02}", total_cents % 100)
}

impl NotificationEvent {
    pub fn grade_updated(
        student_id: StudentId,
        student_name: &str,
        assessment_name: &str,
        score: f64,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::GradeUpdated,
            title: format!("Grade Updated for {student_name}"),
            message: format!("New grade recorded for {assessment_name}: {score}%"),
            data: json!({
                "student_id": student_id,
                "assessment_name": assessment_name,
                "score": score,
            }),
            email: true,
        }
    }

    /// Emailed only for absences and late arrivals.
    pub fn attendance_marked(
        student_id: StudentId,
        student_name: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        let label = match status {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
        };
        Self {
            student_id,
            kind: NotificationType::AttendanceMarked,
            title: format!("Attendance Update for {student_name}"),
            message: format!("Attendance marked for {}: {label}", date.format("%B %d, %Y")),
            data: json!({
                "student_id": student_id,
                "date": date,
                "status": status,
            }),
            email: status.is_concerning(),
        }
    }

    pub fn payment_confirmed(
        student_id: StudentId,
        student_name: &str,
        invoice_id: InvoiceId,
        amount: f64,
        balance: f64,
        currency: &str,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::FeePaymentConfirmed,
            title: format!("Fee Payment Confirmed for {student_name}"),
            message: format!(
                "Payment of {} received. Outstanding balance: {}",
                money(currency, amount),
                money(currency, balance)
            ),
            data: json!({
                "student_id": student_id,
                "invoice_id": invoice_id,
                "amount": amount,
                "balance": balance,
            }),
            email: true,
        }
    }

    pub fn fee_reminder(
        student_id: StudentId,
        student_name: &str,
        invoice_id: InvoiceId,
        term: &str,
        amount_due: f64,
        due_date: NaiveDate,
        currency: &str,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::FeeReminder,
            title: format!("Fee Payment Reminder for {student_name}"),
            message: format!(
                "Payment of {} for {term} is due on {due_date}. Please make payment to avoid late fees.",
                money(currency, amount_due)
            ),
            data: json!({
                "student_id": student_id,
                "invoice_id": invoice_id,
                "term": term,
                "amount_due": amount_due,
                "due_date": due_date,
            }),
            email: true,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fee_overdue(
        student_id: StudentId,
        student_name: &str,
        invoice_id: InvoiceId,
        term: &str,
        total_due: f64,
        days_overdue: i64,
        due_date: Option<NaiveDate>,
        currency: &str,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::FeeReminder,
            title: format!("Overdue Fee Payment for {student_name}"),
            message: format!(
                "Payment of {} for {term} is {days_overdue} days overdue. Please make immediate payment to avoid additional penalties.",
                money(currency, total_due)
            ),
            data: json!({
                "student_id": student_id,
                "invoice_id": invoice_id,
                "term": term,
                "amount_due": total_due,
                "days_overdue": days_overdue,
                "due_date": due_date,
            }),
            email: true,
        }
    }

    pub fn monthly_statement(
        student_id: StudentId,
        student_name: &str,
        month: &str,
        invoiced: f64,
        outstanding: f64,
        currency: &str,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::FeeReminder,
            title: format!("Fee Statement for {student_name} ({month})"),
            message: format!(
                "Invoiced in {month}: {}. Outstanding including late fees: {}.",
                money(currency, invoiced),
                money(currency, outstanding)
            ),
            data: json!({
                "student_id": student_id,
                "month": month,
                "invoiced": invoiced,
                "outstanding": outstanding,
            }),
            email: true,
        }
    }

    /// Staff-authored notice; every linked guardian may receive it.
    pub fn announcement(student_id: StudentId, title: &str, message: &str, email: bool) -> Self {
        Self {
            student_id,
            kind: NotificationType::GeneralAnnouncement,
            title: title.to_string(),
            message: message.to_string(),
            data: json!({ "student_id": student_id }),
            email,
        }
    }

    /// Emailed only for major and critical cases.
    pub fn disciplinary_case(
        student_id: StudentId,
        case_id: CaseId,
        category: &str,
        severity: &str,
        description: Option<&str>,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::DisciplinaryCase,
            title: format!("Disciplinary Case: {category}"),
            message: format!(
                "A new {} disciplinary case has been registered for your child: {}",
                severity.to_lowercase(),
                description.unwrap_or("No description provided")
            ),
            data: json!({
                "student_id": student_id,
                "case_id": case_id,
                "category": category,
                "severity": severity,
            }),
            email: is_high_severity(severity),
        }
    }

    pub fn disciplinary_case_updated(
        student_id: StudentId,
        case_id: CaseId,
        category: &str,
        severity: &str,
        status: CaseStatus,
        description: Option<&str>,
    ) -> Self {
        Self {
            student_id,
            kind: NotificationType::DisciplinaryCase,
            title: format!("Disciplinary Case Updated: {category}"),
            message: format!(
                "The disciplinary case for your child has been updated to {status}: {}",
                description.unwrap_or("No description provided")
            ),
            data: json!({
                "student_id": student_id,
                "case_id": case_id,
                "category": category,
                "severity": severity,
                "status": status,
            }),
            email: is_high_severity(severity),
        }
    }
}
