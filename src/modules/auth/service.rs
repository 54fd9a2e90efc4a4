use sqlx::PgPool;
use tracing::instrument;

use schoolbase_auth::create_access_token;
use schoolbase_config::JwtConfig;
use schoolbase_core::{AppError, verify_password};
use schoolbase_models::UserWithRoles;

use super::model::{LoginRequest, LoginResponse};
use crate::metrics::track_login;
use crate::modules::users::service::UserService;

pub struct AuthService;

impl AuthService {
    /// Verifies credentials and issues an access token carrying the user's roles.
    ///
    /// Unknown emails, wrong passwords and deactivated accounts all answer 401.
    #[instrument(skip(db, jwt_config, dto), fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let Some(user) = UserService::get_user_by_email(db, &dto.email).await? else {
            track_login(false);
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &user.hashed_password)? {
            track_login(false);
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !user.is_active {
            track_login(false);
            return Err(AppError::unauthorized("Account is deactivated"));
        }

        let roles = UserService::load_roles(db, user.id).await?;
        let student_id = UserService::linked_student(db, user.id).await?;

        let access_token = create_access_token(
            user.id.into_inner(),
            &user.email,
            roles.iter().copied().collect(),
            jwt_config,
        )?;

        track_login(true);
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse::bearer(
            access_token,
            UserWithRoles::new(user, roles, student_id),
        ))
    }

    /// Reloads the caller from the store so role changes show up before the token expires.
    #[instrument(skip(db))]
    pub async fn current_user(db: &PgPool, user_id: uuid::Uuid) -> Result<UserWithRoles, AppError> {
        let user = UserService::get_user(db, user_id.into()).await?;
        if !user.is_active {
            return Err(AppError::unauthorized("Account is deactivated"));
        }
        Ok(user)
    }
}
