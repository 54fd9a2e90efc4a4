use anyhow::Context;
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::StudentId;

use crate::modules::grades::model::{
    ClassReport, ClassReportParams, GradeList, MyGradesParams, ProgressPoint, ReportCard,
    ScoredResult, class_report, progress_series, report_card_lines,
};
use crate::modules::students::service::StudentService;

const SCORED_SELECT: &str = r#"
    SELECT r.assessment_id, r.student_id, a.name AS assessment_name, a.term, a.class_name,
           a.subject, a.weight, a.date, r.score
    FROM exam_results r
    JOIN assessments a ON a.id = r.assessment_id
"#;

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct GradeService;

impl GradeService {
    /// Results for assessments matching the term and class filters.
    async fn class_results(
        db: &PgPool,
        term: Option<&str>,
        class_name: Option<&str>,
    ) -> Result<Vec<ScoredResult>, AppError> {
        let results = sqlx::query_as::<_, ScoredResult>(&format!(
            r#"
            {SCORED_SELECT}
            WHERE ($1::text IS NULL OR a.term = $1)
              AND ($2::text IS NULL OR a.class_name = $2)
            ORDER BY r.student_id, a.date NULLS LAST, a.id
            "#
        ))
        .bind(term)
        .bind(class_name)
        .fetch_all(db)
        .await
        .context("Failed to fetch class results")
        .map_err(AppError::database)?;

        Ok(results)
    }

    /// One student's results in assessment date order.
    async fn student_results(
        db: &PgPool,
        student_id: StudentId,
        term: Option<&str>,
        subject: Option<&str>,
    ) -> Result<Vec<ScoredResult>, AppError> {
        let results = sqlx::query_as::<_, ScoredResult>(&format!(
            r#"
            {SCORED_SELECT}
            WHERE r.student_id = $1
              AND ($2::text IS NULL OR a.term = $2)
              AND ($3::text IS NULL OR a.subject = $3)
            ORDER BY a.date NULLS LAST, a.id
            "#
        ))
        .bind(student_id)
        .bind(term)
        .bind(subject)
        .fetch_all(db)
        .await
        .context("Failed to fetch student results")
        .map_err(AppError::database)?;

        Ok(results)
    }

    #[instrument(skip(db))]
    pub async fn class_report(
        db: &PgPool,
        params: ClassReportParams,
    ) -> Result<ClassReport, AppError> {
        let term = non_blank(&params.term);
        let class_name = non_blank(&params.class_name);
        let results = Self::class_results(db, term, class_name).await?;

        Ok(class_report(
            term.map(str::to_string),
            class_name.map(str::to_string),
            &results,
        ))
    }

    #[instrument(skip(db))]
    pub async fn my_grades(
        db: &PgPool,
        student_id: StudentId,
        params: MyGradesParams,
    ) -> Result<GradeList, AppError> {
        let items = Self::student_results(
            db,
            student_id,
            non_blank(&params.term),
            non_blank(&params.subject),
        )
        .await?;
        Ok(GradeList { items })
    }

    #[instrument(skip(db))]
    pub async fn progress(db: &PgPool, student_id: StudentId) -> Result<Vec<ProgressPoint>, AppError> {
        let results = Self::student_results(db, student_id, None, None).await?;
        Ok(progress_series(&results))
    }

    #[instrument(skip(db))]
    pub async fn report_card(
        db: &PgPool,
        student_id: StudentId,
        term: Option<String>,
    ) -> Result<ReportCard, AppError> {
        let student = StudentService::get_student(db, student_id).await?;
        let term = non_blank(&term).map(str::to_string);
        let results = Self::student_results(db, student_id, term.as_deref(), None).await?;
        let (lines, overall_average) = report_card_lines(&results);

        Ok(ReportCard {
            student_id,
            student_name: student.full_name(),
            admission_no: student.admission_no,
            class_name: student.class_name,
            term,
            lines,
            overall_average,
        })
    }

    #[instrument(skip(db))]
    pub async fn class_results_for_export(
        db: &PgPool,
        class_name: &str,
        term: Option<String>,
    ) -> Result<Vec<ScoredResult>, AppError> {
        Self::class_results(db, non_blank(&term), Some(class_name.trim())).await
    }

    #[instrument(skip(db))]
    pub async fn student_results_for_export(
        db: &PgPool,
        student_id: StudentId,
        term: Option<String>,
    ) -> Result<Vec<ScoredResult>, AppError> {
        StudentService::get_student(db, student_id).await?;
        Self::student_results(db, student_id, non_blank(&term), None).await
    }
}
