use serde::Deserialize;
use utoipa::IntoParams;

use schoolbase_models::ids::StudentId;

pub use schoolbase_models::grading::{
    ClassReport, ClassReportParams, GradeList, MyGradesParams, ProgressPoint, ReportCard,
    ReportCardLine, ScoredResult, SubjectSummary, class_report, class_report_cards_csv,
    class_report_csv, progress_series, report_card_lines, student_report_card_csv,
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReportCardParams {
    /// Ignored for student accounts, which always get their own card.
    #[serde(default, deserialize_with = "schoolbase_core::serde::empty_string_as_none")]
    #[param(value_type = Option<String>, format = "uuid")]
    pub student_id: Option<StudentId>,
    pub term: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TermParams {
    pub term: Option<String>,
}
