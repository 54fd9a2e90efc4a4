//! Student records.
//!
//! `admission_no` is the immutable business key: it is set once on create
//! (or on application approval) and never updated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use schoolbase_core::PaginationParams;

use crate::ids::StudentId;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub class_name: Option<String>,
    pub guardian_contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "ADM-2024-001")]
    pub admission_no: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 20))]
    #[schema(example = "Female")]
    pub gender: Option<String>,
    #[validate(length(max = 50))]
    #[schema(example = "Form 2A")]
    pub class_name: Option<String>,
    #[validate(length(max = 100))]
    pub guardian_contact: Option<String>,
}

/// Partial update. The admission number cannot be changed.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[validate(length(max = 50))]
    pub class_name: Option<String>,
    #[validate(length(max = 100))]
    pub guardian_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct StudentFilterParams {
    /// Matches first name, last name or admission number.
    pub q: Option<String>,
    pub class_name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
