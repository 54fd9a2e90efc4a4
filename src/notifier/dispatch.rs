//! Fan-out of student-scoped events to linked guardians.
//!
//! Runs after the owning transaction has committed. Every step past loading
//! the recipients is best effort: a failed insert or email is logged and the
//! loop moves on to the next guardian.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use schoolbase_models::ids::UserId;
use schoolbase_models::notifications::NotificationPreference;
use schoolbase_models::users::GuardianLink;
use schoolbase_models::{Channel, NotificationEvent, should_send};

use super::{Notifier, OutgoingEmail};
use crate::metrics::track_notifications;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchReport {
    pub recipients: u64,
    pub created: u64,
    pub emailed: u64,
    pub failed: u64,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.recipients += other.recipients;
        self.created += other.created;
        self.emailed += other.emailed;
        self.failed += other.failed;
    }
}

#[derive(Debug, FromRow)]
struct Recipient {
    #[sqlx(flatten)]
    link: GuardianLink,
    email: String,
    is_active: bool,
}

async fn load_recipients(db: &PgPool, event: &NotificationEvent) -> Result<Vec<Recipient>, sqlx::Error> {
    sqlx::query_as::<_, Recipient>(
        r#"
        SELECT gl.id, gl.parent_user_id, gl.student_id, gl.can_access_grades,
               gl.can_access_attendance, gl.can_access_fees, gl.can_access_disciplinary,
               gl.created_at, u.email, u.is_active
        FROM guardian_links gl
        JOIN users u ON u.id = gl.parent_user_id
        WHERE gl.student_id = $1
        ORDER BY gl.created_at, gl.id
        "#,
    )
    .bind(event.student_id)
    .fetch_all(db)
    .await
}

async fn load_preferences(
    db: &PgPool,
    user_ids: Vec<UserId>,
) -> Result<HashMap<UserId, NotificationPreference>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NotificationPreference>(
        r#"
        SELECT user_id, grade_updated, attendance_marked, fee_reminder, fee_payment_confirmed,
               disciplinary_case, timetable_updated, general_announcement,
               email_enabled, sms_enabled, push_enabled
        FROM notification_preferences
        WHERE user_id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(|p| (p.user_id, p)).collect())
}

async fn insert_notification(
    db: &PgPool,
    user_id: UserId,
    event: &NotificationEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, notification_type, title, message, data)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(event.kind)
    .bind(&event.title)
    .bind(&event.message)
    .bind(Json(&event.data))
    .execute(db)
    .await?;
    Ok(())
}

/// Delivers `event` to every guardian linked to its student.
///
/// A guardian linked twice is notified twice. The link's capability flag and
/// the guardian's type toggle gate the in-app row; emails additionally need
/// the event to warrant one and the email channel to be on.
#[instrument(skip(db, notifier, event), fields(student_id = %event.student_id, kind = event.kind.as_str()))]
pub async fn dispatch_notification(
    db: &PgPool,
    notifier: &dyn Notifier,
    event: &NotificationEvent,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    let recipients = match load_recipients(db, event).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Could not load notification recipients");
            report.failed += 1;
            return report;
        }
    };

    if recipients.is_empty() {
        return report;
    }

    let user_ids = recipients.iter().map(|r| r.link.parent_user_id).collect();
    let preferences = load_preferences(db, user_ids).await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load notification preferences; using defaults");
        HashMap::new()
    });

    for recipient in &recipients {
        let user_id = recipient.link.parent_user_id;
        let preference = preferences.get(&user_id);

        if !recipient.link.permits(event.kind) || !should_send(preference, event.kind, Channel::InApp) {
            continue;
        }
        report.recipients += 1;

        match insert_notification(db, user_id, event).await {
            Ok(()) => report.created += 1,
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to store notification");
                report.failed += 1;
                continue;
            }
        }

        if event.email && recipient.is_active && should_send(preference, event.kind, Channel::Email) {
            let email = OutgoingEmail::new(&recipient.email, &event.title, &event.message);
            if notifier.send(&email).await {
                report.emailed += 1;
            } else {
                warn!(%user_id, "Notification email not delivered");
            }
        }
    }

    track_notifications(event.kind.as_str(), report.created, report.emailed);
    report
}

/// Dispatches a batch of events in order, summing the reports.
pub async fn dispatch_all(
    db: &PgPool,
    notifier: &dyn Notifier,
    events: &[NotificationEvent],
) -> DispatchReport {
    let mut total = DispatchReport::default();
    for event in events {
        total.merge(dispatch_notification(db, notifier, event).await);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_fields() {
        let mut a = DispatchReport {
            recipients: 1,
            created: 1,
            emailed: 0,
            failed: 0,
        };
        a.merge(DispatchReport {
            recipients: 2,
            created: 1,
            emailed: 1,
            failed: 1,
        });
        assert_eq!(
            a,
            DispatchReport {
                recipients: 3,
                created: 2,
                emailed: 1,
                failed: 1
            }
        );
    }
}
