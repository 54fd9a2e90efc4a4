use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::ids::{NotificationId, StudentId, UserId};

use super::model::{
    LinkedStudent, MarkedRead, Notification, NotificationListParams, NotificationPreference,
    PreferencesUpdate, UnreadCount,
};
use super::service::NotificationService;
use crate::middleware::auth::{AuthUser, RequireParent};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationListParams),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(
        NotificationService::list_for_user(&state.db, user_id, &params).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread notifications", body = UnreadCount)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn unread_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UnreadCount>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(NotificationService::unread_count(&state.db, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<Notification>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(NotificationService::mark_read(&state.db, user_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Notifications marked read", body = MarkedRead)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MarkedRead>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(NotificationService::mark_all_read(&state.db, user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/notifications/preferences",
    responses(
        (status = 200, description = "Stored or default preferences", body = NotificationPreference)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn get_preferences(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<NotificationPreference>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(NotificationService::preferences(&state.db, user_id).await?))
}

/// Update notification preferences; omitted fields are left unchanged
#[utoipa::path(
    put,
    path = "/api/notifications/preferences",
    request_body = PreferencesUpdate,
    responses(
        (status = 200, description = "Preferences saved", body = NotificationPreference)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state, update))]
pub async fn update_preferences(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<NotificationPreference>, AppError> {
    let user_id = UserId::from(auth_user.user_id()?);
    Ok(Json(
        NotificationService::update_preferences(&state.db, user_id, update).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/notifications/guardian/students",
    responses(
        (status = 200, description = "Students linked to the guardian", body = Vec<LinkedStudent>),
        (status = 403, description = "Not a parent account", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn linked_students(
    State(state): State<AppState>,
    RequireParent(auth_user): RequireParent,
) -> Result<Json<Vec<LinkedStudent>>, AppError> {
    let parent_id = UserId::from(auth_user.user_id()?);
    Ok(Json(
        NotificationService::linked_students(&state.db, parent_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/notifications/guardian/students/{student_id}",
    params(
        ("student_id" = uuid::Uuid, Path, description = "Student ID"),
        NotificationListParams
    ),
    responses(
        (status = 200, description = "Notifications about the student", body = Vec<Notification>),
        (status = 403, description = "Not linked to the student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(skip(state))]
pub async fn linked_student_notifications(
    State(state): State<AppState>,
    RequireParent(auth_user): RequireParent,
    Path(student_id): Path<StudentId>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let parent_id = UserId::from(auth_user.user_id()?);
    Ok(Json(
        NotificationService::for_linked_student(&state.db, parent_id, student_id, &params).await?,
    ))
}
