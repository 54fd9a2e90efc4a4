use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_auth::Role;
use schoolbase_core::AppError;
use schoolbase_models::ids::{AssignmentId, TeacherId};

use crate::middleware::auth::AuthUser;
use crate::modules::teachers::model::{
    AssignmentFilterParams, CreateAssignmentDto, CreateTeacherDto, Teacher, TeacherAssignment,
    TeacherFilterParams, TeachingScope, UpdateTeacherDto,
};

fn email_conflict(e: sqlx::Error, email: Option<&str>) -> AppError {
    if schoolbase_db::is_unique_violation(&e) {
        return AppError::conflict(anyhow!(
            "Teacher with email {} already exists",
            email.unwrap_or_default()
        ));
    }
    AppError::database(e)
}

pub struct TeacherService;

impl TeacherService {
    #[instrument(skip(db, dto))]
    pub async fn create_teacher(db: &PgPool, dto: CreateTeacherDto) -> Result<Teacher, AppError> {
        let email = dto.email.as_deref().map(str::trim);

        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            INSERT INTO teachers (full_name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, full_name, email, phone, created_at
            "#,
        )
        .bind(dto.full_name.trim())
        .bind(email)
        .bind(&dto.phone)
        .fetch_one(db)
        .await
        .map_err(|e| email_conflict(e, email))?;

        tracing::info!(teacher_id = %teacher.id, "Teacher created");
        Ok(teacher)
    }

    #[instrument(skip(db))]
    pub async fn list_teachers(
        db: &PgPool,
        filters: TeacherFilterParams,
    ) -> Result<Vec<Teacher>, AppError> {
        let search = filters
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));

        let teachers = sqlx::query_as::<_, Teacher>(
            r#"
            SELECT id, full_name, email, phone, created_at
            FROM teachers
            WHERE $1::text IS NULL OR full_name ILIKE $1 OR email ILIKE $1
            ORDER BY full_name, id
            "#,
        )
        .bind(search)
        .fetch_all(db)
        .await
        .context("Failed to fetch teachers")
        .map_err(AppError::database)?;

        Ok(teachers)
    }

    #[instrument(skip(db))]
    pub async fn get_teacher(db: &PgPool, id: TeacherId) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, full_name, email, phone, created_at FROM teachers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch teacher")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_teacher(
        db: &PgPool,
        id: TeacherId,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        let email = dto.email.as_deref().map(str::trim);

        sqlx::query_as::<_, Teacher>(
            r#"
            UPDATE teachers
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone)
            WHERE id = $1
            RETURNING id, full_name, email, phone, created_at
            "#,
        )
        .bind(id)
        .bind(dto.full_name.as_deref().map(str::trim))
        .bind(email)
        .bind(&dto.phone)
        .fetch_optional(db)
        .await
        .map_err(|e| email_conflict(e, email))?
        .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    /// Assignments go with the teacher.
    #[instrument(skip(db))]
    pub async fn delete_teacher(db: &PgPool, id: TeacherId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teacher")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Teacher not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_assignment(
        db: &PgPool,
        dto: CreateAssignmentDto,
    ) -> Result<TeacherAssignment, AppError> {
        let assignment = sqlx::query_as::<_, TeacherAssignment>(
            r#"
            INSERT INTO teacher_assignments (teacher_id, class_name, subject)
            VALUES ($1, $2, $3)
            RETURNING id, teacher_id, class_name, subject, created_at
            "#,
        )
        .bind(dto.teacher_id)
        .bind(dto.class_name.trim())
        .bind(dto.subject.trim())
        .fetch_one(db)
        .await
        .map_err(|e| {
            if schoolbase_db::is_unique_violation(&e) {
                return AppError::conflict(anyhow!(
                    "Teacher is already assigned to {} {}",
                    dto.class_name,
                    dto.subject
                ));
            }
            if schoolbase_db::is_foreign_key_violation(&e) {
                return AppError::not_found(anyhow!("Teacher not found"));
            }
            AppError::database(e)
        })?;

        Ok(assignment)
    }

    #[instrument(skip(db))]
    pub async fn list_assignments(
        db: &PgPool,
        filters: AssignmentFilterParams,
    ) -> Result<Vec<TeacherAssignment>, AppError> {
        let assignments = sqlx::query_as::<_, TeacherAssignment>(
            r#"
            SELECT id, teacher_id, class_name, subject, created_at
            FROM teacher_assignments
            WHERE ($1::uuid IS NULL OR teacher_id = $1)
              AND ($2::text IS NULL OR class_name = $2)
              AND ($3::text IS NULL OR subject = $3)
            ORDER BY class_name, subject, id
            "#,
        )
        .bind(filters.teacher_id)
        .bind(&filters.class_name)
        .bind(&filters.subject)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher assignments")
        .map_err(AppError::database)?;

        Ok(assignments)
    }

    #[instrument(skip(db))]
    pub async fn delete_assignment(db: &PgPool, id: AssignmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teacher_assignments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teacher assignment")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Assignment not found")));
        }
        Ok(())
    }

    /// Pairs a teaching caller may work with, found through the Teacher record
    /// sharing the caller's email. Callers without the Teacher role are unrestricted.
    #[instrument(skip(db, auth_user))]
    pub async fn teaching_scope(db: &PgPool, auth_user: &AuthUser) -> Result<TeachingScope, AppError> {
        if !auth_user.has_role(Role::Teacher) {
            return Ok(TeachingScope::Unrestricted);
        }

        let assignments = sqlx::query_as::<_, TeacherAssignment>(
            r#"
            SELECT ta.id, ta.teacher_id, ta.class_name, ta.subject, ta.created_at
            FROM teacher_assignments ta
            JOIN teachers t ON t.id = ta.teacher_id
            WHERE LOWER(t.email) = LOWER($1)
            "#,
        )
        .bind(auth_user.email())
        .fetch_all(db)
        .await
        .context("Failed to resolve teaching scope")
        .map_err(AppError::database)?;

        Ok(TeachingScope::from_assignments(&assignments))
    }
}
