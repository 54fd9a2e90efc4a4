//! Runtime-tunable school settings and their versioned envelope.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A value paired with the version it was read at.
///
/// Writers send back the version they read; a mismatch means someone else
/// updated in between.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Versioned<T> {
    pub version: i64,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SchoolSettings {
    #[schema(example = "Schoolbase Academy")]
    pub school_name: String,
    #[schema(example = "KES")]
    pub currency: String,
    /// Reminders go out for invoices due exactly this many days ahead.
    pub reminder_days_ahead: i64,
    /// Default minimum days past due for the overdue list.
    pub overdue_threshold_days: i64,
    /// Days past due before an invoice with a late fee is flagged in review.
    pub late_fee_grace_days: i64,
    pub expense_categories: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        Self {
            school_name: "Schoolbase Academy".to_string(),
            currency: "KES".to_string(),
            reminder_days_ahead: 3,
            overdue_threshold_days: 0,
            late_fee_grace_days: 7,
            expense_categories: ["utilities", "supplies", "maintenance", "transport", "salaries"]
                .map(String::from)
                .to_vec(),
            payment_methods: ["cash", "bank_transfer", "mobile_money", "cheque"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl SchoolSettings {
    /// Empty lists accept anything.
    pub fn accepts_payment_method(&self, method: &str) -> bool {
        self.payment_methods.is_empty()
            || self
                .payment_methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method.trim()))
    }

    pub fn accepts_expense_category(&self, category: &str) -> bool {
        self.expense_categories.is_empty()
            || self
                .expense_categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SettingsPatch {
    #[validate(length(min = 1, max = 200))]
    pub school_name: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub currency: Option<String>,
    #[validate(range(min = 0, max = 90))]
    pub reminder_days_ahead: Option<i64>,
    #[validate(range(min = 0, max = 365))]
    pub overdue_threshold_days: Option<i64>,
    #[validate(range(min = 0, max = 365))]
    pub late_fee_grace_days: Option<i64>,
    pub expense_categories: Option<Vec<String>>,
    pub payment_methods: Option<Vec<String>>,
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

impl SettingsPatch {
    pub fn apply(&self, s: &mut SchoolSettings) {
        if let Some(v) = &self.school_name {
            s.school_name = v.trim().to_string();
        }
        if let Some(v) = &self.currency {
            s.currency = v.trim().to_uppercase();
        }
        s.reminder_days_ahead = self.reminder_days_ahead.unwrap_or(s.reminder_days_ahead);
        s.overdue_threshold_days = self.overdue_threshold_days.unwrap_or(s.overdue_threshold_days);
        s.late_fee_grace_days = self.late_fee_grace_days.unwrap_or(s.late_fee_grace_days);
        if let Some(v) = &self.expense_categories {
            s.expense_categories = clean_list(v);
        }
        if let Some(v) = &self.payment_methods {
            s.payment_methods = clean_list(v);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsDto {
    /// The version the caller last read.
    pub version: i64,
    #[serde(flatten)]
    #[validate(nested)]
    pub patch: SettingsPatch,
}
