//! Assessments and exam results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AssessmentId, ExamResultId, StudentId};

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Assessment {
    pub id: AssessmentId,
    pub name: String,
    pub term: Option<String>,
    pub class_name: Option<String>,
    pub subject: Option<String>,
    /// Stored for reference; aggregation is unweighted.
    pub weight: f64,
    pub max_score: f64,
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAssessmentDto {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Mid-term exam")]
    pub name: String,
    #[validate(length(max = 20))]
    #[schema(example = "2024-T1")]
    pub term: Option<String>,
    #[validate(length(max = 50))]
    pub class_name: Option<String>,
    #[validate(length(max = 50))]
    pub subject: Option<String>,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub max_score: Option<f64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAssessmentDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub max_score: Option<f64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AssessmentFilterParams {
    pub term: Option<String>,
    pub class_name: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ExamResult {
    pub id: ExamResultId,
    pub assessment_id: AssessmentId,
    pub student_id: StudentId,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

/// A roster line for result entry; `score` is `None` until graded.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ResultRow {
    pub student_id: StudentId,
    pub admission_no: String,
    pub full_name: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssessmentResults {
    pub assessment: Assessment,
    pub items: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScoreItem {
    pub student_id: StudentId,
    #[validate(range(min = 0.0))]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertResultsDto {
    pub assessment_id: AssessmentId,
    #[validate(length(min = 1), nested)]
    pub items: Vec<ScoreItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpsertResultsResponse {
    pub count: usize,
}
