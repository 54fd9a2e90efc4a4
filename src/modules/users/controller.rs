use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_core::pagination::Paginated;
use schoolbase_models::ids::{GuardianLinkId, UserId};

use super::model::{
    CreateGuardianLinkDto, CreateUserDto, GuardianLink, RoleInfo, SetStudentLinkDto,
    UpdateUserDto, UserFilterParams, UserWithRoles,
};
use super::service::UserService;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// List the fixed role catalogue
#[utoipa::path(
    get,
    path = "/api/users/roles",
    responses(
        (status = 200, description = "All roles", body = Vec<RoleInfo>),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_roles() -> Json<Vec<RoleInfo>> {
    Json(UserService::list_roles())
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Paginated users", body = Paginated<UserWithRoles>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 422, description = "Unknown role filter", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<Paginated<UserWithRoles>>, AppError> {
    Ok(Json(UserService::list_users(&state.db, filters).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = UserWithRoles),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<UserWithRoles>), AppError> {
    let user = UserService::create_user(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserWithRoles),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserWithRoles>, AppError> {
    Ok(Json(UserService::get_user(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = UserWithRoles),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<UserWithRoles>, AppError> {
    Ok(Json(UserService::update_user(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    UserService::deactivate_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear the student this account belongs to
#[utoipa::path(
    put,
    path = "/api/users/{id}/student-link",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    request_body = SetStudentLinkDto,
    responses(
        (status = 200, description = "Link updated", body = UserWithRoles),
        (status = 404, description = "User or student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn set_student_link(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(dto): Json<SetStudentLinkDto>,
) -> Result<Json<UserWithRoles>, AppError> {
    Ok(Json(UserService::set_student_link(&state.db, id, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/guardian-links",
    params(("id" = uuid::Uuid, Path, description = "Guardian user ID")),
    responses(
        (status = 200, description = "Guardian links", body = Vec<GuardianLink>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn list_guardian_links(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<GuardianLink>>, AppError> {
    Ok(Json(UserService::list_guardian_links(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/guardian-links",
    params(("id" = uuid::Uuid, Path, description = "Guardian user ID")),
    request_body = CreateGuardianLinkDto,
    responses(
        (status = 201, description = "Link created", body = GuardianLink),
        (status = 404, description = "User or student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn create_guardian_link(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(dto): Json<CreateGuardianLinkDto>,
) -> Result<(StatusCode, Json<GuardianLink>), AppError> {
    let link = UserService::create_guardian_link(&state.db, id, dto).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/guardian-links/{link_id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Guardian user ID"),
        ("link_id" = uuid::Uuid, Path, description = "Link ID")
    ),
    responses(
        (status = 204, description = "Link removed"),
        (status = 404, description = "Link not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state))]
pub async fn delete_guardian_link(
    State(state): State<AppState>,
    Path((id, link_id)): Path<(UserId, GuardianLinkId)>,
) -> Result<StatusCode, AppError> {
    UserService::delete_guardian_link(&state.db, id, link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
