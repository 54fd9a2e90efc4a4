use std::collections::HashMap;

use anyhow::{Context, anyhow};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{instrument, warn};

use schoolbase_auth::{AuthzError, Role, RoleSet};
use schoolbase_core::pagination::Paginated;
use schoolbase_core::{AppError, hash_password};

use crate::modules::users::model::{
    CreateGuardianLinkDto, CreateUserDto, GuardianLink, RoleInfo, SetStudentLinkDto, UpdateUserDto,
    User, UserFilterParams, UserWithRoles, parse_role_names,
};
use schoolbase_models::ids::{GuardianLinkId, StudentId, UserId};

#[derive(Debug, FromRow)]
struct UserRow {
    #[sqlx(flatten)]
    user: User,
    student_id: Option<StudentId>,
}

fn unknown_roles(names: Vec<String>) -> AppError {
    AuthzError::UnknownRole(names.join(", ")).into_app_error()
}

fn roles_from_stored(user_id: UserId, names: &[String]) -> RoleSet {
    let (roles, unknown) = RoleSet::from_names(names);
    if !unknown.is_empty() {
        warn!(%user_id, ?unknown, "Ignoring unrecognised stored roles");
    }
    roles
}

pub struct UserService;

impl UserService {
    pub fn list_roles() -> Vec<RoleInfo> {
        Role::ALL.iter().copied().map(RoleInfo::from).collect()
    }

    #[instrument(skip(db))]
    pub async fn load_roles(db: &PgPool, user_id: UserId) -> Result<RoleSet, AppError> {
        let names = sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await
            .context("Failed to load user roles")
            .map_err(AppError::database)?;

        Ok(roles_from_stored(user_id, &names))
    }

    async fn load_roles_for(
        db: &PgPool,
        user_ids: Vec<UserId>,
    ) -> Result<HashMap<UserId, Vec<String>>, AppError> {
        let rows = sqlx::query_as::<_, (UserId, String)>(
            "SELECT user_id, role FROM user_roles WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(db)
        .await
        .context("Failed to load user roles")
        .map_err(AppError::database)?;

        let mut by_user: HashMap<UserId, Vec<String>> = HashMap::new();
        for (user_id, role) in rows {
            by_user.entry(user_id).or_default().push(role);
        }
        Ok(by_user)
    }

    async fn replace_roles(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        roles: &RoleSet,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let names = roles.names();
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            SELECT $1, UNNEST($2::text[])
            "#,
        )
        .bind(user_id)
        .bind(&names)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// The student record a portal account belongs to, if any.
    #[instrument(skip(db))]
    pub async fn linked_student(db: &PgPool, user_id: UserId) -> Result<Option<StudentId>, AppError> {
        let linked = sqlx::query_scalar::<_, Option<StudentId>>("SELECT student_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await
            .context("Failed to load student link")
            .map_err(AppError::database)?;

        Ok(linked.flatten())
    }

    #[instrument(skip(db))]
    pub async fn get_user_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, hashed_password, is_active, created_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(db)
        .await
        .context("Failed to fetch user by email")
        .map_err(AppError::database)?;

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: UserId) -> Result<UserWithRoles, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, full_name, hashed_password, is_active, created_at, student_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch user")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        let roles = Self::load_roles(db, id).await?;
        Ok(UserWithRoles::new(row.user, roles, row.student_id))
    }

    #[instrument(skip(db))]
    pub async fn list_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<Paginated<UserWithRoles>, AppError> {
        let role = match filters.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(name) => Some(
                name.parse::<Role>()
                    .map_err(|e| e.into_app_error())?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let predicate = r#"
            ($1::text IS NULL OR u.email ILIKE $1 OR u.full_name ILIKE $1)
            AND ($2::text IS NULL OR EXISTS (
                SELECT 1 FROM user_roles ur WHERE ur.user_id = u.id AND ur.role = $2
            ))
            AND ($3::boolean IS NULL OR u.is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users u WHERE {predicate}"
        ))
        .bind(&search)
        .bind(&role)
        .bind(filters.is_active)
        .fetch_one(db)
        .await
        .context("Failed to count users")
        .map_err(AppError::database)?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT u.id, u.email, u.full_name, u.hashed_password, u.is_active, u.created_at, u.student_id
            FROM users u
            WHERE {predicate}
            ORDER BY u.created_at DESC, u.id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&search)
        .bind(&role)
        .bind(filters.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("Failed to fetch users")
        .map_err(AppError::database)?;

        let mut roles = Self::load_roles_for(db, rows.iter().map(|r| r.user.id).collect()).await?;
        let data = rows
            .into_iter()
            .map(|row| {
                let names = roles.remove(&row.user.id).unwrap_or_default();
                let role_set = roles_from_stored(row.user.id, &names);
                UserWithRoles::new(row.user, role_set, row.student_id)
            })
            .collect();

        Ok(Paginated {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<UserWithRoles, AppError> {
        let roles = parse_role_names(&dto.role_names).map_err(unknown_roles)?;
        let hashed_password = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, full_name, hashed_password, is_active, created_at
            "#,
        )
        .bind(dto.email.trim())
        .bind(&dto.full_name)
        .bind(&hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if schoolbase_db::is_unique_violation(&e) {
                return AppError::conflict(anyhow!("User with email {} already exists", dto.email));
            }
            AppError::database(e)
        })?;

        Self::replace_roles(&mut tx, user.id, &roles).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, roles = ?roles.names(), "User created");
        Ok(UserWithRoles::new(user, roles, None))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_user(
        db: &PgPool,
        id: UserId,
        dto: UpdateUserDto,
    ) -> Result<UserWithRoles, AppError> {
        let roles = match &dto.role_names {
            Some(names) => Some(parse_role_names(names).map_err(unknown_roles)?),
            None => None,
        };
        let hashed_password = match &dto.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let mut tx = db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                hashed_password = COALESCE($3, hashed_password),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&dto.full_name)
        .bind(&hashed_password)
        .bind(dto.is_active)
        .execute(&mut *tx)
        .await
        .context("Failed to update user")
        .map_err(AppError::database)?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        if let Some(roles) = &roles {
            Self::replace_roles(&mut tx, id, roles).await?;
        }

        tx.commit().await?;
        Self::get_user(db, id).await
    }

    /// Users are never hard-deleted; deactivation blocks login.
    #[instrument(skip(db))]
    pub async fn deactivate_user(db: &PgPool, id: UserId) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to deactivate user")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn set_student_link(
        db: &PgPool,
        id: UserId,
        dto: SetStudentLinkDto,
    ) -> Result<UserWithRoles, AppError> {
        let result = sqlx::query("UPDATE users SET student_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(dto.student_id)
            .execute(db)
            .await
            .map_err(|e| {
                if schoolbase_db::is_foreign_key_violation(&e) {
                    return AppError::not_found(anyhow!("Student not found"));
                }
                AppError::database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        Self::get_user(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn list_guardian_links(db: &PgPool, user_id: UserId) -> Result<Vec<GuardianLink>, AppError> {
        let links = sqlx::query_as::<_, GuardianLink>(
            r#"
            SELECT id, parent_user_id, student_id, can_access_grades, can_access_attendance,
                   can_access_fees, can_access_disciplinary, created_at
            FROM guardian_links
            WHERE parent_user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch guardian links")
        .map_err(AppError::database)?;

        Ok(links)
    }

    /// Links are not deduplicated: linking the same pair twice yields two rows.
    #[instrument(skip(db, dto))]
    pub async fn create_guardian_link(
        db: &PgPool,
        user_id: UserId,
        dto: CreateGuardianLinkDto,
    ) -> Result<GuardianLink, AppError> {
        let link = sqlx::query_as::<_, GuardianLink>(
            r#"
            INSERT INTO guardian_links
                (parent_user_id, student_id, can_access_grades, can_access_attendance,
                 can_access_fees, can_access_disciplinary)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, parent_user_id, student_id, can_access_grades, can_access_attendance,
                      can_access_fees, can_access_disciplinary, created_at
            "#,
        )
        .bind(user_id)
        .bind(dto.student_id)
        .bind(dto.can_access_grades)
        .bind(dto.can_access_attendance)
        .bind(dto.can_access_fees)
        .bind(dto.can_access_disciplinary)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if schoolbase_db::is_foreign_key_violation(&e) {
                return AppError::not_found(anyhow!("User or student not found"));
            }
            AppError::database(e)
        })?;

        Ok(link)
    }

    #[instrument(skip(db))]
    pub async fn delete_guardian_link(
        db: &PgPool,
        user_id: UserId,
        link_id: GuardianLinkId,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM guardian_links WHERE id = $1 AND parent_user_id = $2")
            .bind(link_id)
            .bind(user_id)
            .execute(db)
            .await
            .context("Failed to delete guardian link")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Guardian link not found")));
        }
        Ok(())
    }
}
