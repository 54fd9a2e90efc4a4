use anyhow::{Context, anyhow};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use schoolbase_auth::resolve_self_student;
use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::ids::{StudentId, UserId};

use crate::middleware::auth::AuthUser;
use crate::modules::students::model::{
    CreateStudentDto, Student, StudentFilterParams, UpdateStudentDto,
};
use crate::modules::users::service::UserService;

const STUDENT_COLUMNS: &str =
    "id, admission_no, first_name, last_name, date_of_birth, gender, class_name, guardian_contact, created_at";

pub struct StudentService;

impl StudentService {
    /// Inserts a student inside an existing transaction. Application approval
    /// uses this so the student and the decision commit together.
    pub async fn insert_student(
        tx: &mut Transaction<'_, Postgres>,
        dto: &CreateStudentDto,
    ) -> Result<Student, AppError> {
        let admission_no = dto.admission_no.trim();

        sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students
                (admission_no, first_name, last_name, date_of_birth, gender, class_name, guardian_contact)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(admission_no)
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(dto.date_of_birth)
        .bind(&dto.gender)
        .bind(&dto.class_name)
        .bind(&dto.guardian_contact)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if schoolbase_db::is_unique_violation(&e) {
                return AppError::conflict(anyhow!(
                    "Admission number {} is already in use",
                    admission_no
                ));
            }
            AppError::database(e)
        })
    }

    #[instrument(skip(db, dto), fields(admission_no = %dto.admission_no))]
    pub async fn create_student(db: &PgPool, dto: CreateStudentDto) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;
        let student = Self::insert_student(&mut tx, &dto).await?;
        tx.commit().await?;

        tracing::info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, id: StudentId) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch student")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_students(
        db: &PgPool,
        filters: StudentFilterParams,
    ) -> Result<Paginated<Student>, AppError> {
        let search = filters
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));
        let class_name = filters
            .class_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let predicate = r#"
            ($1::text IS NULL
                OR first_name ILIKE $1
                OR last_name ILIKE $1
                OR admission_no ILIKE $1)
            AND ($2::text IS NULL OR class_name = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM students WHERE {predicate}"
        ))
        .bind(&search)
        .bind(class_name)
        .fetch_one(db)
        .await
        .context("Failed to count students")
        .map_err(AppError::database)?;

        let data = sqlx::query_as::<_, Student>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students
            WHERE {predicate}
            ORDER BY last_name, first_name, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&search)
        .bind(class_name)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("Failed to fetch students")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn update_student(
        db: &PgPool,
        id: StudentId,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                gender = COALESCE($5, gender),
                class_name = COALESCE($6, class_name),
                guardian_contact = COALESCE($7, guardian_contact)
            WHERE id = $1
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.date_of_birth)
        .bind(&dto.gender)
        .bind(&dto.class_name)
        .bind(&dto.guardian_contact)
        .fetch_optional(db)
        .await
        .context("Failed to update student")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    /// Unconditional: invoices, payments, results, attendance and cases cascade.
    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, id: StudentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete student")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Student not found")));
        }

        tracing::info!(student_id = %id, "Student deleted");
        Ok(())
    }

    /// Resolves the student a personal endpoint acts on.
    ///
    /// Student callers are pinned to their own linked record and `requested` is
    /// ignored; a student account without a link is refused. Other callers must
    /// name a student.
    #[instrument(skip(db, auth_user))]
    pub async fn resolve_self(
        db: &PgPool,
        auth_user: &AuthUser,
        requested: Option<StudentId>,
    ) -> Result<StudentId, AppError> {
        let user_id = UserId::from(auth_user.user_id()?);
        let linked = UserService::linked_student(db, user_id).await?;

        let resolved = resolve_self_student(
            &auth_user.roles(),
            linked.map(Uuid::from),
            requested.map(Uuid::from),
        )
        .map_err(|e| e.into_app_error())?;

        resolved
            .map(StudentId::from)
            .ok_or_else(|| AppError::bad_request(anyhow!("student_id is required")))
    }
}
