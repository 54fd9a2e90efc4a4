use anyhow::{Context, anyhow};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{NotificationId, StudentId, UserId};

use crate::modules::notifications::model::{
    LinkedStudent, MarkedRead, Notification, NotificationListParams, NotificationPreference,
    PreferencesUpdate, UnreadCount,
};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, message, data, is_read, created_at, read_at";

const PREFERENCE_COLUMNS: &str = "user_id, grade_updated, attendance_marked, fee_reminder, fee_payment_confirmed, disciplinary_case, timetable_updated, general_announcement, email_enabled, sms_enabled, push_enabled";

pub struct NotificationService;

impl NotificationService {
    #[instrument(skip(db))]
    pub async fn list_for_user(
        db: &PgPool,
        user_id: UserId,
        params: &NotificationListParams,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(params.unread_only())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch notifications")
        .map_err(AppError::database)?;

        Ok(notifications)
    }

    #[instrument(skip(db))]
    pub async fn unread_count(db: &PgPool, user_id: UserId) -> Result<UnreadCount, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("Failed to count unread notifications")
        .map_err(AppError::database)?;

        Ok(UnreadCount { count })
    }

    /// Another user's notification is reported as missing.
    #[instrument(skip(db))]
    pub async fn mark_read(
        db: &PgPool,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("Failed to mark notification read")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Notification not found")))
    }

    #[instrument(skip(db))]
    pub async fn mark_all_read(db: &PgPool, user_id: UserId) -> Result<MarkedRead, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE user_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await
        .context("Failed to mark notifications read")
        .map_err(AppError::database)?;

        Ok(MarkedRead {
            updated: result.rows_affected(),
        })
    }

    /// Stored preferences, or the defaults when the user never saved any.
    #[instrument(skip(db))]
    pub async fn preferences(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<NotificationPreference, AppError> {
        let stored = sqlx::query_as::<_, NotificationPreference>(&format!(
            "SELECT {PREFERENCE_COLUMNS} FROM notification_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch notification preferences")
        .map_err(AppError::database)?;

        Ok(stored.unwrap_or_else(|| NotificationPreference::defaults(user_id)))
    }

    #[instrument(skip(db, update))]
    pub async fn update_preferences(
        db: &PgPool,
        user_id: UserId,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreference, AppError> {
        let mut prefs = Self::preferences(db, user_id).await?;
        update.apply(&mut prefs);

        let saved = sqlx::query_as::<_, NotificationPreference>(&format!(
            r#"
            INSERT INTO notification_preferences ({PREFERENCE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id) DO UPDATE
            SET grade_updated = EXCLUDED.grade_updated,
                attendance_marked = EXCLUDED.attendance_marked,
                fee_reminder = EXCLUDED.fee_reminder,
                fee_payment_confirmed = EXCLUDED.fee_payment_confirmed,
                disciplinary_case = EXCLUDED.disciplinary_case,
                timetable_updated = EXCLUDED.timetable_updated,
                general_announcement = EXCLUDED.general_announcement,
                email_enabled = EXCLUDED.email_enabled,
                sms_enabled = EXCLUDED.sms_enabled,
                push_enabled = EXCLUDED.push_enabled
            RETURNING {PREFERENCE_COLUMNS}
            "#
        ))
        .bind(prefs.user_id)
        .bind(prefs.grade_updated)
        .bind(prefs.attendance_marked)
        .bind(prefs.fee_reminder)
        .bind(prefs.fee_payment_confirmed)
        .bind(prefs.disciplinary_case)
        .bind(prefs.timetable_updated)
        .bind(prefs.general_announcement)
        .bind(prefs.email_enabled)
        .bind(prefs.sms_enabled)
        .bind(prefs.push_enabled)
        .fetch_one(db)
        .await
        .context("Failed to save notification preferences")
        .map_err(AppError::database)?;

        tracing::info!(user_id = %user_id, "Notification preferences updated");
        Ok(saved)
    }

    #[instrument(skip(db))]
    pub async fn linked_students(
        db: &PgPool,
        parent_id: UserId,
    ) -> Result<Vec<LinkedStudent>, AppError> {
        let students = sqlx::query_as::<_, LinkedStudent>(
            r#"
            SELECT s.id, s.admission_no, s.first_name || ' ' || s.last_name AS full_name,
                   s.class_name, gl.can_access_grades, gl.can_access_attendance,
                   gl.can_access_fees, gl.can_access_disciplinary
            FROM guardian_links gl
            JOIN students s ON s.id = gl.student_id
            WHERE gl.parent_user_id = $1
            ORDER BY s.last_name, s.first_name, s.id
            "#,
        )
        .bind(parent_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch linked students")
        .map_err(AppError::database)?;

        Ok(students)
    }

    /// The guardian's own notifications about one of their linked students.
    #[instrument(skip(db))]
    pub async fn for_linked_student(
        db: &PgPool,
        parent_id: UserId,
        student_id: StudentId,
        params: &NotificationListParams,
    ) -> Result<Vec<Notification>, AppError> {
        let linked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM guardian_links WHERE parent_user_id = $1 AND student_id = $2)",
        )
        .bind(parent_id)
        .bind(student_id)
        .fetch_one(db)
        .await
        .context("Failed to check guardian link")
        .map_err(AppError::database)?;

        if !linked {
            return Err(AppError::forbidden("You are not linked to this student"));
        }

        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 AND data->>'student_id' = $2
              AND (NOT $3 OR is_read = FALSE)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(parent_id)
        .bind(student_id.to_string())
        .bind(params.unread_only())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch student notifications")
        .map_err(AppError::database)?;

        Ok(notifications)
    }

    /// Deletes read notifications older than `days`.
    #[instrument(skip(db))]
    pub async fn purge_read_older_than(db: &PgPool, days: i64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::days(days);
        let result = sqlx::query("DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1")
            .bind(cutoff)
            .execute(db)
            .await
            .context("Failed to purge old notifications")
            .map_err(AppError::database)?;

        Ok(result.rows_affected())
    }
}
