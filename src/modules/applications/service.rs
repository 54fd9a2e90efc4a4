use anyhow::{Context, anyhow};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{instrument, warn};

use schoolbase_core::AppError;
use schoolbase_models::ids::ApplicationId;
use schoolbase_models::students::CreateStudentDto;

use crate::modules::applications::model::{
    Application, ApplicationFilterParams, ApplicationStatus, ApplicationStatusView,
    ApprovalOutcome, ApproveApplicationDto, CreateApplicationDto, RejectApplicationDto,
    generate_reference,
};
use crate::modules::students::service::StudentService;

const APPLICATION_COLUMNS: &str = "id, reference, first_name, last_name, date_of_birth, gender, \
     class_name, guardian_contact, email, status, decision_reason, processed_at, created_at";

const MAX_REFERENCE_ATTEMPTS: usize = 5;

fn new_reference() -> String {
    let today = chrono::Utc::now().date_naive();
    generate_reference(today, &mut rand::thread_rng())
}

pub struct ApplicationService;

impl ApplicationService {
    /// Creates a pending application, retrying on the rare reference collision.
    #[instrument(skip(db, dto))]
    pub async fn submit_application(
        db: &PgPool,
        dto: CreateApplicationDto,
    ) -> Result<Application, AppError> {
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let reference = new_reference();

            let inserted = sqlx::query_as::<_, Application>(&format!(
                r#"
                INSERT INTO applications
                    (reference, first_name, last_name, date_of_birth, gender, class_name,
                     guardian_contact, email)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {APPLICATION_COLUMNS}
                "#
            ))
            .bind(&reference)
            .bind(dto.first_name.trim())
            .bind(dto.last_name.trim())
            .bind(dto.date_of_birth)
            .bind(&dto.gender)
            .bind(&dto.class_name)
            .bind(&dto.guardian_contact)
            .bind(&dto.email)
            .fetch_one(db)
            .await;

            match inserted {
                Ok(application) => {
                    tracing::info!(reference = %application.reference, "Application submitted");
                    return Ok(application);
                }
                Err(e) if schoolbase_db::is_unique_violation(&e) => {
                    warn!(attempt, %reference, "Application reference collision, retrying");
                }
                Err(e) => return Err(AppError::database(e)),
            }
        }

        Err(AppError::internal_error(
            "Could not allocate an application reference",
        ))
    }

    #[instrument(skip(db))]
    pub async fn get_status(db: &PgPool, reference: &str) -> Result<ApplicationStatusView, AppError> {
        sqlx::query_as::<_, ApplicationStatusView>(
            r#"
            SELECT reference, status, decision_reason, processed_at, created_at
            FROM applications
            WHERE reference = $1
            "#,
        )
        .bind(reference.trim())
        .fetch_optional(db)
        .await
        .context("Failed to fetch application status")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Application not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_applications(
        db: &PgPool,
        filters: ApplicationFilterParams,
    ) -> Result<Vec<Application>, AppError> {
        let applications = sqlx::query_as::<_, Application>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(filters.status)
        .fetch_all(db)
        .await
        .context("Failed to fetch applications")
        .map_err(AppError::database)?;

        Ok(applications)
    }

    #[instrument(skip(db))]
    pub async fn get_application(db: &PgPool, id: ApplicationId) -> Result<Application, AppError> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch application")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Application not found")))
    }

    /// Locks the application row and fails with 409 unless it is still pending.
    async fn lock_pending(
        tx: &mut Transaction<'_, Postgres>,
        id: ApplicationId,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to lock application")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Application not found")))?;

        if application.status.is_terminal() {
            return Err(AppError::conflict(anyhow!(
                "Application has already been {}",
                application.status
            )));
        }
        Ok(application)
    }

    async fn record_decision(
        tx: &mut Transaction<'_, Postgres>,
        id: ApplicationId,
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(&format!(
            r#"
            UPDATE applications
            SET status = $2, decision_reason = $3, processed_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to record application decision")
        .map_err(AppError::database)?;

        Ok(application)
    }

    /// Creates exactly one student and closes the application in one transaction.
    #[instrument(skip(db, dto), fields(admission_no = %dto.admission_no))]
    pub async fn approve_application(
        db: &PgPool,
        id: ApplicationId,
        dto: ApproveApplicationDto,
    ) -> Result<ApprovalOutcome, AppError> {
        let mut tx = db.begin().await?;

        let pending = Self::lock_pending(&mut tx, id).await?;

        let student_dto = CreateStudentDto {
            admission_no: dto.admission_no,
            first_name: pending.first_name,
            last_name: pending.last_name,
            date_of_birth: pending.date_of_birth,
            gender: pending.gender,
            class_name: dto.class_name.or(pending.class_name),
            guardian_contact: pending.guardian_contact,
        };
        let student = StudentService::insert_student(&mut tx, &student_dto).await?;

        let application =
            Self::record_decision(&mut tx, id, ApplicationStatus::Approved, None).await?;

        tx.commit().await?;

        tracing::info!(
            application_id = %id,
            student_id = %student.id,
            "Application approved"
        );
        Ok(ApprovalOutcome {
            application,
            student,
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn reject_application(
        db: &PgPool,
        id: ApplicationId,
        dto: RejectApplicationDto,
    ) -> Result<Application, AppError> {
        let mut tx = db.begin().await?;

        Self::lock_pending(&mut tx, id).await?;
        let application = Self::record_decision(
            &mut tx,
            id,
            ApplicationStatus::Rejected,
            Some(dto.reason.trim()),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(application_id = %id, "Application rejected");
        Ok(application)
    }
}
