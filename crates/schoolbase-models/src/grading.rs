//! Grading aggregation.
//!
//! All rollups are unweighted means over individual scores: every result row
//! contributes once, whatever its assessment's `weight`. Averages and pass
//! rates are rounded to one decimal place.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use schoolbase_core::csv::CsvWriter;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::ids::{AssessmentId, StudentId};

/// Scores at or above this mark count as a pass.
pub const PASS_MARK: f64 = 50.0;

/// Subject label used when an assessment has none.
pub const NO_SUBJECT: &str = "(none)";

/// One result row joined to the assessment fields the rollups need.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ScoredResult {
    pub assessment_id: AssessmentId,
    pub student_id: StudentId,
    pub assessment_name: String,
    pub term: Option<String>,
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub weight: f64,
    pub date: Option<NaiveDate>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ClassReportParams {
    pub term: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubjectSummary {
    pub subject: String,
    pub average: f64,
    pub pass_rate: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClassReport {
    pub term: Option<String>,
    pub class_name: Option<String>,
    pub overall_average: f64,
    pub overall_pass_rate: f64,
    /// Largest result count seen on a single assessment. Only reported when
    /// the report is filtered to one class.
    pub approx_class_size: Option<usize>,
    pub subjects: Vec<SubjectSummary>,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    round1(scores.iter().sum::<f64>() / scores.len() as f64)
}

pub fn pass_rate(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let passed = scores.iter().filter(|s| **s >= PASS_MARK).count();
    round1(passed as f64 / scores.len() as f64 * 100.0)
}

/// Rolls results up overall and per subject. Subjects are sorted by name.
pub fn class_report(
    term: Option<String>,
    class_name: Option<String>,
    results: &[ScoredResult],
) -> ClassReport {
    let overall: Vec<f64> = results.iter().map(|r| r.score).collect();

    let mut by_subject: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut per_assessment: HashMap<AssessmentId, usize> = HashMap::new();
    for r in results {
        by_subject
            .entry(r.subject.as_deref().unwrap_or(NO_SUBJECT))
            .or_default()
            .push(r.score);
        *per_assessment.entry(r.assessment_id).or_default() += 1;
    }

    let approx_class_size = class_name
        .as_ref()
        .and_then(|_| per_assessment.values().copied().max());

    let subjects = by_subject
        .into_iter()
        .map(|(subject, scores)| SubjectSummary {
            subject: subject.to_string(),
            average: average(&scores),
            pass_rate: pass_rate(&scores),
            count: scores.len(),
        })
        .collect();

    ClassReport {
        term,
        class_name,
        overall_average: average(&overall),
        overall_pass_rate: pass_rate(&overall),
        approx_class_size,
        subjects,
    }
}

/// Flattens a report into `type,term,class_name,metric,value` rows.
pub fn class_report_csv(report: &ClassReport) -> String {
    let term = report.term.clone().unwrap_or_default();
    let class_name = report.class_name.clone().unwrap_or_default();
    let mut csv = CsvWriter::with_header(&["type", "term", "class_name", "metric", "value"]);
    let mut push = |kind: &str, metric: &str, value: String| {
        csv.row(&[kind, term.as_str(), class_name.as_str(), metric, value.as_str()]);
    };

    push("overall", "overall_average", report.overall_average.to_string());
    push("overall", "overall_pass_rate", report.overall_pass_rate.to_string());
    for s in &report.subjects {
        push("subject", &format!("{}_average", s.subject), s.average.to_string());
        push("subject", &format!("{}_pass_rate", s.subject), s.pass_rate.to_string());
        push("subject", &format!("{}_count", s.subject), s.count.to_string());
    }
    csv.finish()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProgressPoint {
    pub term: String,
    pub average: f64,
}

/// Average per term, sorted by term label. Results without a term fall
/// under the empty label.
pub fn progress_series(results: &[ScoredResult]) -> Vec<ProgressPoint> {
    let mut by_term: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in results {
        by_term
            .entry(r.term.clone().unwrap_or_default())
            .or_default()
            .push(r.score);
    }
    by_term
        .into_iter()
        .map(|(term, scores)| ProgressPoint {
            term,
            average: average(&scores),
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct MyGradesParams {
    pub term: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GradeList {
    pub items: Vec<ScoredResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportCardLine {
    pub subject: String,
    pub average: f64,
    pub assessments: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportCard {
    pub student_id: StudentId,
    pub student_name: String,
    pub admission_no: String,
    pub class_name: Option<String>,
    pub term: Option<String>,
    pub lines: Vec<ReportCardLine>,
    pub overall_average: f64,
}

/// Builds one student's report card from their results.
pub fn report_card_lines(results: &[ScoredResult]) -> (Vec<ReportCardLine>, f64) {
    let mut by_subject: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in results {
        by_subject
            .entry(r.subject.as_deref().unwrap_or(NO_SUBJECT))
            .or_default()
            .push(r.score);
    }
    let lines = by_subject
        .into_iter()
        .map(|(subject, scores)| {
            let avg = average(&scores);
            ReportCardLine {
                subject: subject.to_string(),
                average: avg,
                assessments: scores.len(),
                passed: avg >= PASS_MARK,
            }
        })
        .collect();
    let all: Vec<f64> = results.iter().map(|r| r.score).collect();
    (lines, average(&all))
}

/// Per-result CSV for a whole class (`student_id,assessment_id,subject,score`).
pub fn class_report_cards_csv(results: &[ScoredResult]) -> String {
    let mut csv = CsvWriter::with_header(&["student_id", "assessment_id", "subject", "score"]);
    for r in results {
        csv.row(&[
            r.student_id.to_string(),
            r.assessment_id.to_string(),
            r.subject.clone().unwrap_or_default(),
            r.score.to_string(),
        ]);
    }
    csv.finish()
}

/// Per-result CSV for one student (`assessment_id,subject,score`).
pub fn student_report_card_csv(results: &[ScoredResult]) -> String {
    let mut csv = CsvWriter::with_header(&["assessment_id", "subject", "score"]);
    for r in results {
        csv.row(&[
            r.assessment_id.to_string(),
            r.subject.clone().unwrap_or_default(),
            r.score.to_string(),
        ]);
    }
    csv.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(assessment: AssessmentId, subject: &str, term: &str, score: f64) -> ScoredResult {
        ScoredResult {
            assessment_id: assessment,
            student_id: StudentId::new(),
            assessment_name: "CAT".to_string(),
            term: Some(term.to_string()),
            class_name: Some("Form 1".to_string()),
            subject: Some(subject.to_string()),
            weight: 1.0,
            date: None,
            score,
        }
    }

    #[test]
    fn test_class_report_three_scores() {
        let a = AssessmentId::new();
        let results = vec![
            result(a, "Maths", "T1", 40.0),
            result(a, "Maths", "T1", 60.0),
            result(a, "Maths", "T1", 80.0),
        ];
        let report = class_report(Some("T1".into()), None, &results);
        assert_eq!(report.overall_average, 60.0);
        assert_eq!(report.overall_pass_rate, 66.7);
        assert_eq!(report.subjects.len(), 1);
        assert_eq!(report.subjects[0].count, 3);
        assert!(report.approx_class_size.is_none());
    }

    #[test]
    fn test_weight_is_ignored() {
        let a = AssessmentId::new();
        let mut heavy = result(a, "Maths", "T1", 100.0);
        heavy.weight = 10.0;
        let results = vec![heavy, result(a, "Maths", "T1", 0.0)];
        assert_eq!(class_report(None, None, &results).overall_average, 50.0);
    }

    #[test]
    fn test_per_subject_rollup_sorted() {
        let a = AssessmentId::new();
        let b = AssessmentId::new();
        let results = vec![
            result(a, "Physics", "T1", 30.0),
            result(b, "Biology", "T1", 70.0),
            result(b, "Biology", "T1", 49.9),
        ];
        let report = class_report(None, Some("Form 1".into()), &results);
        let names: Vec<_> = report.subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["Biology", "Physics"]);
        assert_eq!(report.subjects[0].pass_rate, 50.0);
        assert_eq!(report.subjects[1].pass_rate, 0.0);
        assert_eq!(report.approx_class_size, Some(2));
    }

    #[test]
    fn test_empty_report_is_zeroed() {
        let report = class_report(None, Some("Form 4".into()), &[]);
        assert_eq!(report.overall_average, 0.0);
        assert_eq!(report.overall_pass_rate, 0.0);
        assert!(report.subjects.is_empty());
        assert!(report.approx_class_size.is_none());
    }

    #[test]
    fn test_missing_subject_grouped() {
        let mut r = result(AssessmentId::new(), "x", "T1", 55.0);
        r.subject = None;
        let report = class_report(None, None, &[r]);
        assert_eq!(report.subjects[0].subject, NO_SUBJECT);
    }

    #[test]
    fn test_csv_layout() {
        let a = AssessmentId::new();
        let report = class_report(Some("T1".into()), Some("F1".into()), &[result(a, "Maths", "T1", 80.0)]);
        let csv = class_report_csv(&report);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "type,term,class_name,metric,value");
        assert_eq!(lines[1], "overall,T1,F1,overall_average,80");
        assert_eq!(lines[3], "subject,T1,F1,Maths_average,80");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_progress_series_sorted_by_term() {
        let a = AssessmentId::new();
        let results = vec![
            result(a, "Maths", "2024-T2", 70.0),
            result(a, "Maths", "2024-T1", 50.0),
            result(a, "English", "2024-T1", 60.0),
        ];
        let series = progress_series(&results);
        assert_eq!(
            series,
            vec![
                ProgressPoint { term: "2024-T1".into(), average: 55.0 },
                ProgressPoint { term: "2024-T2".into(), average: 70.0 },
            ]
        );
    }

    #[test]
    fn test_report_card_lines() {
        let a = AssessmentId::new();
        let results = vec![
            result(a, "Maths", "T1", 40.0),
            result(a, "Maths", "T1", 50.0),
            result(a, "English", "T1", 90.0),
        ];
        let (lines, overall) = report_card_lines(&results);
        assert_eq!(lines[0].subject, "English");
        assert!(lines[0].passed);
        assert_eq!(lines[1].average, 45.0);
        assert!(!lines[1].passed);
        assert_eq!(overall, 60.0);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(average(&[1.0, 2.0]), 1.5);
    }
}
