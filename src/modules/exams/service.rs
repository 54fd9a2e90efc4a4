use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::NotificationEvent;
use schoolbase_models::ids::{AssessmentId, StudentId};
use schoolbase_models::teachers::TeachingScope;

use crate::modules::exams::model::{
    Assessment, AssessmentFilterParams, AssessmentResults, CreateAssessmentDto, DEFAULT_MAX_SCORE,
    DEFAULT_WEIGHT, ResultRow, UpdateAssessmentDto, UpsertResultsDto, UpsertResultsResponse,
};
use crate::notifier::{Notifier, dispatch_all};

const ASSESSMENT_COLUMNS: &str =
    "id, name, term, class_name, subject, weight, max_score, date, created_at";

fn outside_scope() -> AppError {
    AppError::forbidden("You are not assigned to this class and subject")
}

fn ensure_in_scope(scope: &TeachingScope, assessment: &Assessment) -> Result<(), AppError> {
    if scope.allows(assessment.class_name.as_deref(), assessment.subject.as_deref()) {
        Ok(())
    } else {
        Err(outside_scope())
    }
}

pub struct ExamService;

impl ExamService {
    #[instrument(skip(db, dto))]
    pub async fn create_assessment(
        db: &PgPool,
        scope: &TeachingScope,
        dto: CreateAssessmentDto,
    ) -> Result<Assessment, AppError> {
        if !scope.allows(dto.class_name.as_deref(), dto.subject.as_deref()) {
            return Err(outside_scope());
        }

        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            r#"
            INSERT INTO assessments (name, term, class_name, subject, weight, max_score, date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        ))
        .bind(dto.name.trim())
        .bind(&dto.term)
        .bind(&dto.class_name)
        .bind(&dto.subject)
        .bind(dto.weight.unwrap_or(DEFAULT_WEIGHT))
        .bind(dto.max_score.unwrap_or(DEFAULT_MAX_SCORE))
        .bind(dto.date)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if schoolbase_db::is_unique_violation(&e) {
                return AppError::conflict(anyhow!(
                    "Assessment {} already exists for this term, class and subject",
                    dto.name
                ));
            }
            AppError::database(e)
        })?;

        tracing::info!(assessment_id = %assessment.id, "Assessment created");
        Ok(assessment)
    }

    /// Teaching callers only see their assigned (class, subject) pairs.
    #[instrument(skip(db))]
    pub async fn list_assessments(
        db: &PgPool,
        scope: &TeachingScope,
        filters: AssessmentFilterParams,
    ) -> Result<Vec<Assessment>, AppError> {
        let (classes, subjects) = match scope.as_arrays() {
            Some((classes, subjects)) => (Some(classes), Some(subjects)),
            None => (None, None),
        };

        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            r#"
            SELECT {ASSESSMENT_COLUMNS}
            FROM assessments
            WHERE ($1::text IS NULL OR term = $1)
              AND ($2::text IS NULL OR class_name = $2)
              AND ($3::text IS NULL OR subject = $3)
              AND ($4::text[] IS NULL OR (class_name, subject) IN (
                  SELECT * FROM UNNEST($4::text[], $5::text[])
              ))
            ORDER BY date DESC NULLS LAST, created_at DESC, id
            "#
        ))
        .bind(&filters.term)
        .bind(&filters.class_name)
        .bind(&filters.subject)
        .bind(classes)
        .bind(subjects)
        .fetch_all(db)
        .await
        .context("Failed to fetch assessments")
        .map_err(AppError::database)?;

        Ok(assessments)
    }

    async fn find_assessment(db: &PgPool, id: AssessmentId) -> Result<Assessment, AppError> {
        sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch assessment")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Assessment not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_assessment(
        db: &PgPool,
        scope: &TeachingScope,
        id: AssessmentId,
    ) -> Result<Assessment, AppError> {
        let assessment = Self::find_assessment(db, id).await?;
        ensure_in_scope(scope, &assessment)?;
        Ok(assessment)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_assessment(
        db: &PgPool,
        scope: &TeachingScope,
        id: AssessmentId,
        dto: UpdateAssessmentDto,
    ) -> Result<Assessment, AppError> {
        let existing = Self::find_assessment(db, id).await?;
        ensure_in_scope(scope, &existing)?;

        sqlx::query_as::<_, Assessment>(&format!(
            r#"
            UPDATE assessments
            SET name = COALESCE($2, name),
                weight = COALESCE($3, weight),
                max_score = COALESCE($4, max_score),
                date = COALESCE($5, date)
            WHERE id = $1
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.weight)
        .bind(dto.max_score)
        .bind(dto.date)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            if schoolbase_db::is_unique_violation(&e) {
                return AppError::conflict(anyhow!(
                    "An assessment with that name already exists for this term, class and subject"
                ));
            }
            AppError::database(e)
        })?
        .ok_or_else(|| AppError::not_found(anyhow!("Assessment not found")))
    }

    /// Results go with the assessment.
    #[instrument(skip(db))]
    pub async fn delete_assessment(
        db: &PgPool,
        scope: &TeachingScope,
        id: AssessmentId,
    ) -> Result<(), AppError> {
        let existing = Self::find_assessment(db, id).await?;
        ensure_in_scope(scope, &existing)?;

        sqlx::query("DELETE FROM assessments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete assessment")
            .map_err(AppError::database)?;

        Ok(())
    }

    /// The class roster with any recorded score per student.
    #[instrument(skip(db))]
    pub async fn get_results(
        db: &PgPool,
        scope: &TeachingScope,
        id: AssessmentId,
    ) -> Result<AssessmentResults, AppError> {
        let assessment = Self::find_assessment(db, id).await?;
        ensure_in_scope(scope, &assessment)?;

        let items = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT s.id AS student_id, s.admission_no,
                   s.first_name || ' ' || s.last_name AS full_name,
                   r.score
            FROM students s
            LEFT JOIN exam_results r ON r.student_id = s.id AND r.assessment_id = $1
            WHERE ($2::text IS NULL OR s.class_name = $2)
            ORDER BY s.last_name, s.first_name, s.id
            "#,
        )
        .bind(id)
        .bind(&assessment.class_name)
        .fetch_all(db)
        .await
        .context("Failed to fetch assessment results")
        .map_err(AppError::database)?;

        Ok(AssessmentResults { assessment, items })
    }

    /// Upserts scores in one transaction, then notifies guardians per score.
    #[instrument(skip(db, notifier, dto), fields(assessment_id = %dto.assessment_id, items = dto.items.len()))]
    pub async fn upsert_results(
        db: &PgPool,
        notifier: &dyn Notifier,
        scope: &TeachingScope,
        dto: UpsertResultsDto,
    ) -> Result<UpsertResultsResponse, AppError> {
        let assessment = Self::find_assessment(db, dto.assessment_id).await?;
        ensure_in_scope(scope, &assessment)?;

        if let Some(item) = dto.items.iter().find(|i| i.score > assessment.max_score) {
            return Err(AppError::unprocessable(anyhow!(
                "Score {} exceeds the maximum of {}",
                item.score,
                assessment.max_score
            )));
        }

        let mut tx = db.begin().await?;
        let mut graded: Vec<(StudentId, String, f64)> = Vec::with_capacity(dto.items.len());

        for item in &dto.items {
            let name = sqlx::query_scalar::<_, String>(
                r#"
                WITH upserted AS (
                    INSERT INTO exam_results (assessment_id, student_id, score)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (assessment_id, student_id)
                    DO UPDATE SET score = EXCLUDED.score, updated_at = NOW()
                    RETURNING student_id
                )
                SELECT s.first_name || ' ' || s.last_name
                FROM upserted u
                JOIN students s ON s.id = u.student_id
                "#,
            )
            .bind(dto.assessment_id)
            .bind(item.student_id)
            .bind(item.score)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if schoolbase_db::is_foreign_key_violation(&e) {
                    return AppError::not_found(anyhow!("Student {} not found", item.student_id));
                }
                AppError::database(e)
            })?;

            graded.push((item.student_id, name, item.score));
        }

        tx.commit().await?;

        let events: Vec<NotificationEvent> = graded
            .iter()
            .map(|(student_id, name, score)| {
                NotificationEvent::grade_updated(*student_id, name, &assessment.name, *score)
            })
            .collect();
        dispatch_all(db, notifier, &events).await;

        tracing::info!(count = graded.len(), "Results saved");
        Ok(UpsertResultsResponse {
            count: graded.len(),
        })
    }
}
