//! Disciplinary cases.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use schoolbase_core::csv::CsvWriter;
use schoolbase_core::serde::empty_string_as_none;

use crate::ids::{CaseId, StudentId, UserId};
use crate::text_enum::impl_text_enum;

pub const DEFAULT_CASE_LIMIT: i64 = 100;
pub const MAX_CASE_LIMIT: i64 = 1000;
pub const RECENT_CASES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Open,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(CaseStatus::Open),
            "closed" => Ok(CaseStatus::Closed),
            other => Err(format!("invalid case status: {other}")),
        }
    }
}

impl_text_enum!(CaseStatus);

/// Severity is free text; `Major` and `Critical` (any case) also go out by email.
pub fn is_high_severity(severity: &str) -> bool {
    matches!(severity.trim().to_lowercase().as_str(), "major" | "critical")
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct DisciplinaryCase {
    pub id: CaseId,
    pub student_id: StudentId,
    pub date: DateTime<Utc>,
    pub category: String,
    #[schema(example = "Minor")]
    pub severity: String,
    pub status: CaseStatus,
    pub description: Option<String>,
    pub actions_taken: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A case joined with the student fields the listing and gender filter need.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CaseWithStudent {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub case: DisciplinaryCase,
    pub student_name: String,
    pub admission_no: String,
    pub gender: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCaseDto {
    pub student_id: StudentId,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Bullying")]
    pub category: String,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "Major")]
    pub severity: String,
    pub status: Option<CaseStatus>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub actions_taken: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCaseDto {
    pub date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub severity: Option<String>,
    pub status: Option<CaseStatus>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub actions_taken: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CaseFilterParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub status: Option<CaseStatus>,
    pub severity: Option<String>,
    /// `Male` or `Female`.
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i64>)]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i64>)]
    pub offset: Option<i64>,
}

impl CaseFilterParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_CASE_LIMIT).clamp(1, MAX_CASE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisciplineSummary {
    pub total: i64,
    pub open: i64,
    pub closed: i64,
    pub by_severity: Vec<SeverityCount>,
    pub recent: Vec<CaseWithStudent>,
}

impl DisciplineSummary {
    /// Tallies `cases`, which must be ordered newest first.
    pub fn from_cases(cases: Vec<CaseWithStudent>) -> Self {
        let total = cases.len() as i64;
        let open = cases
            .iter()
            .filter(|c| c.case.status == CaseStatus::Open)
            .count() as i64;

        let mut by_severity: Vec<SeverityCount> = Vec::new();
        for c in &cases {
            let label = c.case.severity.trim();
            match by_severity
                .iter_mut()
                .find(|s| s.severity.eq_ignore_ascii_case(label))
            {
                Some(entry) => entry.count += 1,
                None => by_severity.push(SeverityCount {
                    severity: label.to_string(),
                    count: 1,
                }),
            }
        }
        by_severity.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.severity.cmp(&b.severity)));

        let recent = cases.into_iter().take(RECENT_CASES).collect();
        Self {
            total,
            open,
            closed: total - open,
            by_severity,
            recent,
        }
    }
}

pub fn cases_csv(rows: &[CaseWithStudent]) -> String {
    let mut csv = CsvWriter::with_header(&[
        "id",
        "date",
        "admission_no",
        "student_name",
        "class_name",
        "category",
        "severity",
        "status",
        "description",
        "actions_taken",
    ]);
    for r in rows {
        csv.row(&[
            r.case.id.to_string(),
            r.case.date.to_rfc3339(),
            r.admission_no.clone(),
            r.student_name.clone(),
            r.class_name.clone().unwrap_or_default(),
            r.case.category.clone(),
            r.case.severity.clone(),
            r.case.status.to_string(),
            r.case.description.clone().unwrap_or_default(),
            r.case.actions_taken.clone().unwrap_or_default(),
        ]);
    }
    csv.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(severity: &str, status: CaseStatus) -> CaseWithStudent {
        CaseWithStudent {
            case: DisciplinaryCase {
                id: CaseId::new(),
                student_id: StudentId::new(),
                date: Utc::now(),
                category: "Lateness".into(),
                severity: severity.into(),
                status,
                description: None,
                actions_taken: None,
                created_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            student_name: "Amina Njeri".into(),
            admission_no: "ADM-001".into(),
            gender: Some("Female".into()),
            class_name: Some("Form 2".into()),
        }
    }

    #[test]
    fn test_high_severity() {
        assert!(is_high_severity("Major"));
        assert!(is_high_severity(" critical "));
        assert!(!is_high_severity("Minor"));
        assert!(!is_high_severity("moderate"));
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        let p = CaseFilterParams::default();
        assert_eq!(p.limit(), 100);
        let p = CaseFilterParams {
            limit: Some(5000),
            ..Default::default()
        };
        assert_eq!(p.limit(), 1000);
    }

    #[test]
    fn test_summary_counts() {
        let cases: Vec<_> = (0..7)
            .map(|i| {
                let status = if i % 2 == 0 { CaseStatus::Open } else { CaseStatus::Closed };
                case(if i < 4 { "Minor" } else { "major" }, status)
            })
            .collect();
        let summary = DisciplineSummary::from_cases(cases);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.open, 4);
        assert_eq!(summary.closed, 3);
        assert_eq!(summary.recent.len(), 5);
        assert_eq!(summary.by_severity[0].severity, "Minor");
        assert_eq!(summary.by_severity[0].count, 4);
        assert_eq!(summary.by_severity[1].count, 3);
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let csv = cases_csv(&[case("Minor", CaseStatus::Open)]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("ADM-001,Amina Njeri,Form 2,Lateness,Minor,open"));
    }
}
