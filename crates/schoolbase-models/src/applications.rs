//! Admission applications.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │
//!    └────reject────▶ rejected
//! ```
//!
//! Both outcomes are terminal. Approval is the only path from an application
//! to a [`Student`](crate::students::Student).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::ApplicationId;
use crate::text_enum::impl_text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl_text_enum!(ApplicationStatus);

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("invalid application status: {other}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Application {
    pub id: ApplicationId,
    pub reference: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub class_name: Option<String>,
    pub guardian_contact: Option<String>,
    pub email: Option<String>,
    pub status: ApplicationStatus,
    pub decision_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What an anonymous applicant can see when checking on a reference.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ApplicationStatusView {
    pub reference: String,
    pub status: ApplicationStatus,
    pub decision_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateApplicationDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[validate(length(max = 50))]
    pub class_name: Option<String>,
    #[validate(length(max = 100))]
    pub guardian_contact: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApproveApplicationDto {
    #[validate(length(min = 1, max = 50))]
    pub admission_no: String,
    /// Overrides the class the applicant asked for.
    #[validate(length(max = 50))]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectApplicationDto {
    #[validate(length(min = 1))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ApplicationFilterParams {
    #[serde(default, deserialize_with = "schoolbase_core::serde::empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub status: Option<ApplicationStatus>,
}

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_SUFFIX_LEN: usize = 6;

/// Builds a reference of the form `APP-YYYYMMDD-XXXXXX`.
pub fn generate_reference<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("APP-{}-{}", date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_reference_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let reference = generate_reference(date, &mut rng);
        assert!(reference.starts_with("APP-20240109-"));
        let suffix = &reference["APP-20240109-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_references_differ() {
        let mut rng = StdRng::seed_from_u64(1);
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_ne!(generate_reference(date, &mut rng), generate_reference(date, &mut rng));
    }

    #[test]
    fn test_status_parse_and_terminal() {
        assert_eq!("Approved".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Approved);
        assert!("archived".parse::<ApplicationStatus>().is_err());
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_reject_requires_reason() {
        let dto = RejectApplicationDto { reason: String::new() };
        assert!(dto.validate().is_err());
    }
}
