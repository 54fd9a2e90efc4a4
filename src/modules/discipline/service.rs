use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_auth::{Gender, RoleSet, check_gender_scope, has_gender_scope};
use schoolbase_core::AppError;
use schoolbase_models::NotificationEvent;
use schoolbase_models::discipline::MAX_CASE_LIMIT;
use schoolbase_models::ids::{CaseId, UserId};

use crate::modules::discipline::model::{
    CaseFilterParams, CaseStatus, CaseWithStudent, CreateCaseDto, DisciplinaryCase,
    DisciplineSummary, UpdateCaseDto,
};
use crate::modules::students::service::StudentService;
use crate::notifier::{Notifier, dispatch_notification};

const CASE_COLUMNS: &str = "id, student_id, date, category, severity, status, description, actions_taken, created_by, created_at, updated_at";

const CASE_WITH_STUDENT_SELECT: &str = r#"
    SELECT c.id, c.student_id, c.date, c.category, c.severity, c.status, c.description,
           c.actions_taken, c.created_by, c.created_at, c.updated_at,
           s.first_name || ' ' || s.last_name AS student_name,
           s.admission_no, s.gender, s.class_name
    FROM disciplinary_cases c
    JOIN students s ON s.id = c.student_id
"#;

/// Lowercased gender spellings a scoped caller may see; `None` when unrestricted.
fn visible_genders(roles: &RoleSet) -> Option<Vec<String>> {
    if !has_gender_scope(roles) {
        return None;
    }
    Some(
        [Gender::Male, Gender::Female]
            .into_iter()
            .filter(|g| check_gender_scope(roles, Some(g.as_str())).is_ok())
            .flat_map(|g| match g {
                Gender::Male => ["male", "m"],
                Gender::Female => ["female", "f"],
            })
            .map(String::from)
            .collect(),
    )
}

fn case_not_found() -> AppError {
    AppError::not_found(anyhow!("Disciplinary case not found"))
}

pub struct DisciplineService;

impl DisciplineService {
    /// Creating a case for a student outside the caller's gender scope is refused.
    #[instrument(skip(db, notifier, roles, dto), fields(student_id = %dto.student_id))]
    pub async fn create_case(
        db: &PgPool,
        notifier: &dyn Notifier,
        roles: &RoleSet,
        created_by: UserId,
        dto: CreateCaseDto,
    ) -> Result<DisciplinaryCase, AppError> {
        let student = StudentService::get_student(db, dto.student_id).await?;
        check_gender_scope(roles, student.gender.as_deref()).map_err(|e| e.into_app_error())?;

        let case = sqlx::query_as::<_, DisciplinaryCase>(&format!(
            r#"
            INSERT INTO disciplinary_cases
                (student_id, date, category, severity, status, description, actions_taken, created_by)
            VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8)
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(student.id)
        .bind(dto.date)
        .bind(dto.category.trim())
        .bind(dto.severity.trim())
        .bind(dto.status.unwrap_or(CaseStatus::Open))
        .bind(&dto.description)
        .bind(&dto.actions_taken)
        .bind(created_by)
        .fetch_one(db)
        .await
        .context("Failed to create disciplinary case")
        .map_err(AppError::database)?;

        tracing::info!(case_id = %case.id, severity = %case.severity, "Disciplinary case created");

        let event = NotificationEvent::disciplinary_case(
            case.student_id,
            case.id,
            &case.category,
            &case.severity,
            case.description.as_deref(),
        );
        dispatch_notification(db, notifier, &event).await;

        Ok(case)
    }

    /// Scoped supervisors only see cases for students of their gender.
    #[instrument(skip(db, roles))]
    pub async fn list_cases(
        db: &PgPool,
        roles: &RoleSet,
        filters: &CaseFilterParams,
    ) -> Result<Vec<CaseWithStudent>, AppError> {
        Self::query_cases(db, roles, filters, filters.limit(), filters.offset()).await
    }

    async fn query_cases(
        db: &PgPool,
        roles: &RoleSet,
        filters: &CaseFilterParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CaseWithStudent>, AppError> {
        let cases = sqlx::query_as::<_, CaseWithStudent>(&format!(
            r#"
            {CASE_WITH_STUDENT_SELECT}
            WHERE ($1::uuid IS NULL OR c.student_id = $1)
              AND ($2::text IS NULL OR c.status = $2)
              AND ($3::text IS NULL OR LOWER(c.severity) = LOWER($3))
              AND ($4::text IS NULL OR LOWER(s.gender) = LOWER($4))
              AND ($5::timestamptz IS NULL OR c.date >= $5)
              AND ($6::timestamptz IS NULL OR c.date <= $6)
              AND ($7::text[] IS NULL OR LOWER(TRIM(s.gender)) = ANY($7))
            ORDER BY c.date DESC, c.id
            LIMIT $8 OFFSET $9
            "#
        ))
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(&filters.severity)
        .bind(&filters.gender)
        .bind(filters.from)
        .bind(filters.to)
        .bind(visible_genders(roles))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("Failed to fetch disciplinary cases")
        .map_err(AppError::database)?;

        Ok(cases)
    }

    async fn find_case(db: &PgPool, id: CaseId) -> Result<CaseWithStudent, AppError> {
        sqlx::query_as::<_, CaseWithStudent>(&format!("{CASE_WITH_STUDENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch disciplinary case")
            .map_err(AppError::database)?
            .ok_or_else(case_not_found)
    }

    #[instrument(skip(db, roles))]
    pub async fn get_case(db: &PgPool, roles: &RoleSet, id: CaseId) -> Result<CaseWithStudent, AppError> {
        let case = Self::find_case(db, id).await?;
        check_gender_scope(roles, case.gender.as_deref()).map_err(|e| e.into_app_error())?;
        Ok(case)
    }

    /// The owning student is looked up again on every call before the scope check.
    #[instrument(skip(db, notifier, roles, dto))]
    pub async fn update_case(
        db: &PgPool,
        notifier: &dyn Notifier,
        roles: &RoleSet,
        id: CaseId,
        dto: UpdateCaseDto,
    ) -> Result<DisciplinaryCase, AppError> {
        let current = Self::find_case(db, id).await?;
        check_gender_scope(roles, current.gender.as_deref()).map_err(|e| e.into_app_error())?;

        let case = sqlx::query_as::<_, DisciplinaryCase>(&format!(
            r#"
            UPDATE disciplinary_cases
            SET date = COALESCE($2, date),
                category = COALESCE($3, category),
                severity = COALESCE($4, severity),
                status = COALESCE($5, status),
                description = COALESCE($6, description),
                actions_taken = COALESCE($7, actions_taken),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.date)
        .bind(dto.category.as_deref().map(str::trim))
        .bind(dto.severity.as_deref().map(str::trim))
        .bind(dto.status)
        .bind(&dto.description)
        .bind(&dto.actions_taken)
        .fetch_optional(db)
        .await
        .context("Failed to update disciplinary case")
        .map_err(AppError::database)?
        .ok_or_else(case_not_found)?;

        if case.status != current.case.status {
            let event = NotificationEvent::disciplinary_case_updated(
                case.student_id,
                case.id,
                &case.category,
                &case.severity,
                case.status,
                case.description.as_deref(),
            );
            dispatch_notification(db, notifier, &event).await;
        }

        Ok(case)
    }

    #[instrument(skip(db, roles))]
    pub async fn delete_case(db: &PgPool, roles: &RoleSet, id: CaseId) -> Result<(), AppError> {
        let current = Self::find_case(db, id).await?;
        check_gender_scope(roles, current.gender.as_deref()).map_err(|e| e.into_app_error())?;

        sqlx::query("DELETE FROM disciplinary_cases WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete disciplinary case")
            .map_err(AppError::database)?;

        tracing::info!(case_id = %id, "Disciplinary case deleted");
        Ok(())
    }

    /// Totals by status and severity plus the most recent cases, over every
    /// case matching `filters`.
    #[instrument(skip(db, roles))]
    pub async fn summary(
        db: &PgPool,
        roles: &RoleSet,
        filters: &CaseFilterParams,
    ) -> Result<DisciplineSummary, AppError> {
        let cases = Self::query_cases(db, roles, filters, i64::MAX, 0).await?;
        Ok(DisciplineSummary::from_cases(cases))
    }

    #[instrument(skip(db, roles))]
    pub async fn cases_for_export(
        db: &PgPool,
        roles: &RoleSet,
        filters: &CaseFilterParams,
    ) -> Result<Vec<CaseWithStudent>, AppError> {
        Self::query_cases(db, roles, filters, MAX_CASE_LIMIT, filters.offset()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolbase_auth::Role;

    fn roles(list: &[Role]) -> RoleSet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_visible_genders_unrestricted() {
        assert_eq!(visible_genders(&roles(&[Role::DirectorOfDiscipline])), None);
    }

    #[test]
    fn test_visible_genders_patron() {
        assert_eq!(
            visible_genders(&roles(&[Role::Patron])),
            Some(vec!["male".to_string(), "m".to_string()])
        );
    }

    #[test]
    fn test_visible_genders_both_supervisor_roles() {
        let genders = visible_genders(&roles(&[Role::Patron, Role::Matron])).unwrap();
        assert_eq!(genders.len(), 4);
        assert!(genders.contains(&"f".to_string()));
    }
}
