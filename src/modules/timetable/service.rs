use anyhow::{Context, anyhow};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{AllocationId, SlotId, StudentId};

use crate::modules::students::service::StudentService;
use crate::modules::timetable::model::{
    AllocationFilterParams, ConflictReport, CreateAllocationDto, CreateSlotDto, MyTimetable,
    SlotFilterParams, SubjectAllocation, TimetableConfig, TimetableSlot, UpdateAllocationDto,
    UpdateSlotDto, UpsertConfigDto, compute_conflicts,
};

const CONFIG_COLUMNS: &str = "id, term, start_time, period_minutes, days, blocks, updated_at";

const ALLOCATION_COLUMNS: &str =
    "id, term, class_name, subject, required_per_week, teacher_id, created_at";

const SLOT_COLUMNS: &str =
    "id, term, day_of_week, period_index, class_name, subject, room, teacher_id, created_at";

fn map_slot_error(e: sqlx::Error) -> AppError {
    if schoolbase_db::is_unique_violation(&e) {
        return AppError::conflict(anyhow!(
            "That class already has a lesson in this period"
        ));
    }
    if schoolbase_db::is_foreign_key_violation(&e) {
        return AppError::not_found(anyhow!("Teacher not found"));
    }
    AppError::database(e)
}

fn map_allocation_error(e: sqlx::Error) -> AppError {
    if schoolbase_db::is_unique_violation(&e) {
        return AppError::conflict(anyhow!(
            "This subject is already allocated to the class for the term"
        ));
    }
    if schoolbase_db::is_foreign_key_violation(&e) {
        return AppError::not_found(anyhow!("Teacher not found"));
    }
    AppError::database(e)
}

pub struct TimetableService;

impl TimetableService {
    #[instrument(skip(db))]
    pub async fn get_config(db: &PgPool, term: &str) -> Result<TimetableConfig, AppError> {
        Self::find_config(db, term)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No timetable configured for {}", term)))
    }

    async fn find_config(db: &PgPool, term: &str) -> Result<Option<TimetableConfig>, AppError> {
        sqlx::query_as::<_, TimetableConfig>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM timetable_configs WHERE term = $1"
        ))
        .bind(term)
        .fetch_optional(db)
        .await
        .context("Failed to fetch timetable config")
        .map_err(AppError::database)
    }

    /// One config per term; a second write replaces the first.
    #[instrument(skip(db, dto), fields(term = %dto.term))]
    pub async fn upsert_config(db: &PgPool, dto: UpsertConfigDto) -> Result<TimetableConfig, AppError> {
        let blocks = if dto.blocks.is_null() {
            serde_json::json!([])
        } else {
            dto.blocks
        };

        let config = sqlx::query_as::<_, TimetableConfig>(&format!(
            r#"
            INSERT INTO timetable_configs (term, start_time, period_minutes, days, blocks)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (term) DO UPDATE
            SET start_time = EXCLUDED.start_time,
                period_minutes = EXCLUDED.period_minutes,
                days = EXCLUDED.days,
                blocks = EXCLUDED.blocks,
                updated_at = NOW()
            RETURNING {CONFIG_COLUMNS}
            "#
        ))
        .bind(dto.term.trim())
        .bind(&dto.start_time)
        .bind(dto.period_minutes)
        .bind(Json(&dto.days))
        .bind(Json(blocks))
        .fetch_one(db)
        .await
        .context("Failed to save timetable config")
        .map_err(AppError::database)?;

        Ok(config)
    }

    #[instrument(skip(db, dto))]
    pub async fn create_allocation(
        db: &PgPool,
        dto: CreateAllocationDto,
    ) -> Result<SubjectAllocation, AppError> {
        sqlx::query_as::<_, SubjectAllocation>(&format!(
            r#"
            INSERT INTO subject_allocations (term, class_name, subject, required_per_week, teacher_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ALLOCATION_COLUMNS}
            "#
        ))
        .bind(dto.term.trim())
        .bind(dto.class_name.trim())
        .bind(dto.subject.trim())
        .bind(dto.required_per_week)
        .bind(dto.teacher_id)
        .fetch_one(db)
        .await
        .map_err(map_allocation_error)
    }

    #[instrument(skip(db))]
    pub async fn list_allocations(
        db: &PgPool,
        filters: AllocationFilterParams,
    ) -> Result<Vec<SubjectAllocation>, AppError> {
        let allocations = sqlx::query_as::<_, SubjectAllocation>(&format!(
            r#"
            SELECT {ALLOCATION_COLUMNS}
            FROM subject_allocations
            WHERE ($1::text IS NULL OR term = $1)
              AND ($2::text IS NULL OR class_name = $2)
            ORDER BY term, class_name, subject
            "#
        ))
        .bind(&filters.term)
        .bind(&filters.class_name)
        .fetch_all(db)
        .await
        .context("Failed to fetch allocations")
        .map_err(AppError::database)?;

        Ok(allocations)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_allocation(
        db: &PgPool,
        id: AllocationId,
        dto: UpdateAllocationDto,
    ) -> Result<SubjectAllocation, AppError> {
        sqlx::query_as::<_, SubjectAllocation>(&format!(
            r#"
            UPDATE subject_allocations
            SET required_per_week = COALESCE($2, required_per_week),
                teacher_id = COALESCE($3, teacher_id)
            WHERE id = $1
            RETURNING {ALLOCATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.required_per_week)
        .bind(dto.teacher_id)
        .fetch_optional(db)
        .await
        .map_err(map_allocation_error)?
        .ok_or_else(|| AppError::not_found(anyhow!("Allocation not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_allocation(db: &PgPool, id: AllocationId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subject_allocations WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete allocation")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Allocation not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_slot(db: &PgPool, dto: CreateSlotDto) -> Result<TimetableSlot, AppError> {
        let slot = sqlx::query_as::<_, TimetableSlot>(&format!(
            r#"
            INSERT INTO timetable_slots (term, day_of_week, period_index, class_name, subject, room, teacher_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(dto.term.trim())
        .bind(dto.day_of_week)
        .bind(dto.period_index)
        .bind(dto.class_name.trim())
        .bind(dto.subject.trim())
        .bind(dto.room.as_deref().map(str::trim))
        .bind(dto.teacher_id)
        .fetch_one(db)
        .await
        .map_err(map_slot_error)?;

        tracing::info!(slot_id = %slot.id, "Timetable slot created");
        Ok(slot)
    }

    #[instrument(skip(db))]
    pub async fn list_slots(
        db: &PgPool,
        filters: SlotFilterParams,
    ) -> Result<Vec<TimetableSlot>, AppError> {
        let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM timetable_slots
            WHERE ($1::text IS NULL OR term = $1)
              AND ($2::text IS NULL OR class_name = $2)
              AND ($3::text IS NULL OR day_of_week = $3)
              AND ($4::uuid IS NULL OR teacher_id = $4)
            ORDER BY term, class_name, day_of_week, period_index
            "#
        ))
        .bind(&filters.term)
        .bind(&filters.class_name)
        .bind(filters.day_of_week)
        .bind(filters.teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch timetable slots")
        .map_err(AppError::database)?;

        Ok(slots)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_slot(
        db: &PgPool,
        id: SlotId,
        dto: UpdateSlotDto,
    ) -> Result<TimetableSlot, AppError> {
        sqlx::query_as::<_, TimetableSlot>(&format!(
            r#"
            UPDATE timetable_slots
            SET day_of_week = COALESCE($2, day_of_week),
                period_index = COALESCE($3, period_index),
                subject = COALESCE($4, subject),
                room = COALESCE($5, room),
                teacher_id = COALESCE($6, teacher_id)
            WHERE id = $1
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.day_of_week)
        .bind(dto.period_index)
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(dto.room.as_deref().map(str::trim))
        .bind(dto.teacher_id)
        .fetch_optional(db)
        .await
        .map_err(map_slot_error)?
        .ok_or_else(|| AppError::not_found(anyhow!("Timetable slot not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_slot(db: &PgPool, id: SlotId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM timetable_slots WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete timetable slot")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Timetable slot not found")));
        }
        Ok(())
    }

    /// Loads every slot and allocation of `term` and runs the conflict engine.
    #[instrument(skip(db))]
    pub async fn conflicts(db: &PgPool, term: &str) -> Result<ConflictReport, AppError> {
        let slots = Self::list_slots(
            db,
            SlotFilterParams {
                term: Some(term.to_string()),
                ..Default::default()
            },
        )
        .await?;
        let allocations = Self::list_allocations(
            db,
            AllocationFilterParams {
                term: Some(term.to_string()),
                class_name: None,
            },
        )
        .await?;

        let conflicts = compute_conflicts(&slots, &allocations);
        tracing::info!(term, conflicts = conflicts.len(), "Timetable conflicts computed");
        Ok(ConflictReport::new(term.to_string(), conflicts))
    }

    /// The timetable of the student's current class.
    #[instrument(skip(db))]
    pub async fn student_timetable(
        db: &PgPool,
        student_id: StudentId,
        term: &str,
    ) -> Result<MyTimetable, AppError> {
        let student = StudentService::get_student(db, student_id).await?;
        let class_name = student
            .class_name
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::forbidden("No class assigned to your student record"))?;

        let slots = Self::list_slots(
            db,
            SlotFilterParams {
                term: Some(term.to_string()),
                class_name: Some(class_name.clone()),
                ..Default::default()
            },
        )
        .await?;
        let config = Self::find_config(db, term).await?;

        Ok(MyTimetable::build(
            term.to_string(),
            class_name,
            slots,
            config.as_ref(),
        ))
    }
}
