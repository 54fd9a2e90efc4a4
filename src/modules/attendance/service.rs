use std::collections::HashMap;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::NotificationEvent;
use schoolbase_models::ids::StudentId;

use crate::modules::attendance::model::{
    Attendance, AttendanceSheet, AttendanceSheetParams, AttendanceSheetRow, AttendanceStatus,
    DateRangeParams, MarkAttendanceDto, MarkAttendanceResponse, StreakSummary, attendance_streaks,
};
use crate::modules::students::service::StudentService;
use crate::notifier::{Notifier, dispatch_all};

pub struct AttendanceService;

impl AttendanceService {
    /// Every student in the class with the day's mark, if any.
    #[instrument(skip(db))]
    pub async fn get_sheet(
        db: &PgPool,
        params: AttendanceSheetParams,
    ) -> Result<AttendanceSheet, AppError> {
        let class_name = params
            .class_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let items = sqlx::query_as::<_, AttendanceSheetRow>(
            r#"
            SELECT s.id AS student_id, s.admission_no,
                   s.first_name || ' ' || s.last_name AS full_name,
                   s.class_name, a.status, a.remarks
            FROM students s
            LEFT JOIN attendance a ON a.student_id = s.id AND a.date = $1
            WHERE ($2::text IS NULL OR s.class_name = $2)
            ORDER BY s.last_name, s.first_name, s.id
            "#,
        )
        .bind(params.date)
        .bind(class_name)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance sheet")
        .map_err(AppError::database)?;

        Ok(AttendanceSheet {
            date: params.date,
            items,
        })
    }

    /// Upserts one mark per item, then notifies guardians of every mark.
    #[instrument(skip(db, notifier, dto), fields(date = %dto.date, items = dto.items.len()))]
    pub async fn mark_attendance(
        db: &PgPool,
        notifier: &dyn Notifier,
        dto: MarkAttendanceDto,
    ) -> Result<MarkAttendanceResponse, AppError> {
        let mut tx = db.begin().await?;

        for item in &dto.items {
            sqlx::query(
                r#"
                INSERT INTO attendance (student_id, date, status, remarks)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (student_id, date)
                DO UPDATE SET status = EXCLUDED.status, remarks = EXCLUDED.remarks
                "#,
            )
            .bind(item.student_id)
            .bind(dto.date)
            .bind(item.status)
            .bind(&item.remarks)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if schoolbase_db::is_foreign_key_violation(&e) {
                    return AppError::not_found(anyhow!("Student {} not found", item.student_id));
                }
                AppError::database(e)
            })?;
        }

        tx.commit().await?;

        let ids = dto.items.iter().map(|item| item.student_id).collect();
        let names = Self::student_names(db, ids).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e.error, "Student name lookup failed; notifying with generic names");
            HashMap::new()
        });
        let events: Vec<NotificationEvent> = dto
            .items
            .iter()
            .map(|item| {
                let name = names
                    .get(&item.student_id)
                    .map(String::as_str)
                    .unwrap_or("your child");
                NotificationEvent::attendance_marked(item.student_id, name, dto.date, item.status)
            })
            .collect();
        dispatch_all(db, notifier, &events).await;

        tracing::info!(count = dto.items.len(), "Attendance marked");
        Ok(MarkAttendanceResponse {
            count: dto.items.len(),
        })
    }

    async fn student_names(
        db: &PgPool,
        ids: Vec<StudentId>,
    ) -> Result<HashMap<StudentId, String>, AppError> {
        let rows = sqlx::query_as::<_, (StudentId, String)>(
            "SELECT id, first_name || ' ' || last_name FROM students WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch student names")
        .map_err(AppError::database)?;

        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(db))]
    pub async fn student_history(
        db: &PgPool,
        student_id: StudentId,
        range: DateRangeParams,
    ) -> Result<Vec<Attendance>, AppError> {
        let records = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, student_id, date, status, remarks, created_at
            FROM attendance
            WHERE student_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC
            "#,
        )
        .bind(student_id)
        .bind(range.start_date)
        .bind(range.end_date)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance history")
        .map_err(AppError::database)?;

        Ok(records)
    }

    #[instrument(skip(db))]
    pub async fn streaks(db: &PgPool, student_id: StudentId) -> Result<StreakSummary, AppError> {
        StudentService::get_student(db, student_id).await?;

        let marks = sqlx::query_as::<_, (NaiveDate, AttendanceStatus)>(
            "SELECT date, status FROM attendance WHERE student_id = $1 ORDER BY date",
        )
        .bind(student_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance marks")
        .map_err(AppError::database)?;

        Ok(attendance_streaks(student_id, &marks))
    }
}
