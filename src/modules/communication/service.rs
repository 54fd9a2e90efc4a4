use std::collections::{HashMap, HashSet};

use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{instrument, warn};

use schoolbase_core::AppError;
use schoolbase_models::NotificationEvent;
use schoolbase_models::ids::{CommTemplateId, StudentId};

use crate::metrics::track_direct_emails;
use crate::modules::communication::model::{
    AnnouncementDto, BulkEmailDto, CommTemplate, CreateTemplateDto, DeliveryReport, Rendered,
    SendEmailDto, UpdateTemplateDto, compose,
};
use crate::modules::students::service::StudentService;
use crate::notifier::{DispatchReport, Notifier, OutgoingEmail, dispatch_notification};

const TEMPLATE_COLUMNS: &str =
    "id, key, description, subject, text_body, html_body, is_active, created_at, updated_at";

fn template_not_found() -> AppError {
    AppError::not_found(anyhow!("Template not found"))
}

fn map_template_error(e: sqlx::Error) -> AppError {
    if schoolbase_db::is_unique_violation(&e) {
        return AppError::conflict(anyhow!("A template with this key already exists"));
    }
    AppError::database(e)
}

fn to_email(to: &str, rendered: &Rendered) -> OutgoingEmail {
    let email = OutgoingEmail::new(to, &rendered.subject, &rendered.text);
    match &rendered.html {
        Some(html) => email.with_html(html),
        None => email,
    }
}

pub struct CommunicationService;

impl CommunicationService {
    #[instrument(skip(db))]
    pub async fn list_templates(db: &PgPool) -> Result<Vec<CommTemplate>, AppError> {
        let templates = sqlx::query_as::<_, CommTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM comm_templates ORDER BY key"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch templates")
        .map_err(AppError::database)?;

        Ok(templates)
    }

    #[instrument(skip(db))]
    pub async fn get_template(db: &PgPool, id: CommTemplateId) -> Result<CommTemplate, AppError> {
        sqlx::query_as::<_, CommTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM comm_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch template")
        .map_err(AppError::database)?
        .ok_or_else(template_not_found)
    }

    #[instrument(skip(db, dto), fields(key = %dto.key))]
    pub async fn create_template(db: &PgPool, dto: CreateTemplateDto) -> Result<CommTemplate, AppError> {
        let template = sqlx::query_as::<_, CommTemplate>(&format!(
            r#"
            INSERT INTO comm_templates (key, description, subject, text_body, html_body, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(dto.key.trim())
        .bind(&dto.description)
        .bind(dto.subject.trim())
        .bind(&dto.text_body)
        .bind(&dto.html_body)
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(db)
        .await
        .map_err(map_template_error)?;

        tracing::info!(template_id = %template.id, "Template created");
        Ok(template)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_template(
        db: &PgPool,
        id: CommTemplateId,
        dto: UpdateTemplateDto,
    ) -> Result<CommTemplate, AppError> {
        sqlx::query_as::<_, CommTemplate>(&format!(
            r#"
            UPDATE comm_templates
            SET key = COALESCE($2, key),
                description = COALESCE($3, description),
                subject = COALESCE($4, subject),
                text_body = COALESCE($5, text_body),
                html_body = COALESCE($6, html_body),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.key.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(&dto.text_body)
        .bind(&dto.html_body)
        .bind(dto.is_active)
        .fetch_optional(db)
        .await
        .map_err(map_template_error)?
        .ok_or_else(template_not_found)
    }

    /// Deleting a template that does not exist succeeds.
    #[instrument(skip(db))]
    pub async fn delete_template(db: &PgPool, id: CommTemplateId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comm_templates WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete template")
            .map_err(AppError::database)?;

        if result.rows_affected() > 0 {
            tracing::info!(template_id = %id, "Template deleted");
        }
        Ok(())
    }

    /// Inactive templates are treated as missing.
    async fn active_template(db: &PgPool, key: &str) -> Result<CommTemplate, AppError> {
        sqlx::query_as::<_, CommTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM comm_templates WHERE key = $1 AND is_active"
        ))
        .bind(key.trim())
        .fetch_optional(db)
        .await
        .context("Failed to fetch template")
        .map_err(AppError::database)?
        .ok_or_else(template_not_found)
    }

    async fn prepare(
        db: &PgPool,
        key: Option<&str>,
        subject: Option<&str>,
        text_body: Option<&str>,
        html_body: Option<&str>,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<Rendered, AppError> {
        let template = match key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Some(Self::active_template(db, key).await?),
            None => None,
        };
        compose(template.as_ref(), subject, text_body, html_body, params)
            .ok_or_else(|| AppError::unprocessable(anyhow!("A subject is required")))
    }

    #[instrument(skip(db, notifier, dto), fields(key = ?dto.key))]
    pub async fn send_email(
        db: &PgPool,
        notifier: &dyn Notifier,
        dto: SendEmailDto,
    ) -> Result<DeliveryReport, AppError> {
        let rendered = Self::prepare(
            db,
            dto.key.as_deref(),
            dto.subject.as_deref(),
            dto.text_body.as_deref(),
            dto.html_body.as_deref(),
            &dto.params,
        )
        .await?;

        let mut report = DeliveryReport::default();
        if notifier.send(&to_email(dto.to.trim(), &rendered)).await {
            report.sent += 1;
        } else {
            warn!("Email not delivered");
            report.failed += 1;
        }

        track_direct_emails(report.sent as u64, report.failed as u64);
        Ok(report)
    }

    /// Sends one rendered message to each distinct recipient.
    #[instrument(skip(db, notifier, dto), fields(recipients = dto.recipients.len()))]
    pub async fn send_bulk(
        db: &PgPool,
        notifier: &dyn Notifier,
        dto: BulkEmailDto,
    ) -> Result<DeliveryReport, AppError> {
        let rendered = Self::prepare(
            db,
            dto.key.as_deref(),
            dto.subject.as_deref(),
            dto.text_body.as_deref(),
            dto.html_body.as_deref(),
            &dto.params,
        )
        .await?;

        let mut seen = HashSet::new();
        let mut report = DeliveryReport::default();
        for to in &dto.recipients {
            let to = to.trim();
            if !seen.insert(to.to_lowercase()) {
                continue;
            }
            if notifier.send(&to_email(to, &rendered)).await {
                report.sent += 1;
            } else {
                warn!(to, "Bulk email not delivered");
                report.failed += 1;
            }
        }

        tracing::info!(sent = report.sent, failed = report.failed, "Bulk email finished");
        track_direct_emails(report.sent as u64, report.failed as u64);
        Ok(report)
    }

    /// Posts a general announcement to every guardian linked to the student.
    #[instrument(skip(db, notifier, dto))]
    pub async fn announce_to_guardians(
        db: &PgPool,
        notifier: &dyn Notifier,
        student_id: StudentId,
        dto: AnnouncementDto,
    ) -> Result<DispatchReport, AppError> {
        let student = StudentService::get_student(db, student_id).await?;

        let event = NotificationEvent::announcement(
            student.id,
            dto.title.trim(),
            dto.message.trim(),
            dto.send_email.unwrap_or(true),
        );
        Ok(dispatch_notification(db, notifier, &event).await)
    }
}
