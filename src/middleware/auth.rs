use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use schoolbase_auth::{Claims, Role, RoleSet, authorize, guards, verify_token};
use schoolbase_core::AppError;

use crate::state::AppState;

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0
            .user_id()
            .ok_or_else(|| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn roles(&self) -> RoleSet {
        self.0.role_set()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.0.roles.contains(&role)
    }

    /// Role-set intersection check against `allowed`.
    pub fn authorize(&self, allowed: &[Role]) -> Result<(), AppError> {
        authorize(&self.roles(), allowed).map_err(|e| e.into_app_error())
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that admits callers whose roles intersect a guard group.
#[macro_export]
macro_rules! require_roles {
    ($name:ident, $allowed:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = schoolbase_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;
                auth_user.authorize($allowed)?;
                Ok($name(auth_user))
            }
        }
    };
}

require_roles!(RequireAdmin, guards::ADMIN);
require_roles!(RequireStudentRecords, guards::STUDENT_RECORDS);
require_roles!(RequireAdmissions, guards::ADMISSIONS);
require_roles!(RequireAttendance, guards::ATTENDANCE);
require_roles!(RequireTeachers, guards::TEACHERS);
require_roles!(RequireExams, guards::EXAMS);
require_roles!(RequireTimetable, guards::TIMETABLE);
require_roles!(RequireAccounting, guards::ACCOUNTING);
require_roles!(RequireDiscipline, guards::DISCIPLINE);
require_roles!(RequireDisciplineWrite, guards::DISCIPLINE_WRITE);
require_roles!(RequireSettingsWrite, guards::SETTINGS_WRITE);
require_roles!(RequireCommunication, guards::COMMUNICATION);
require_roles!(RequireStaff, guards::STAFF);
require_roles!(RequireStudent, guards::STUDENT_PORTAL);
require_roles!(RequireParent, &[Role::Parent]);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn auth_user(roles: Vec<Role>) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "staff@example.com".to_string(),
            roles,
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_authorize_by_intersection() {
        let user = auth_user(vec![Role::Teacher, Role::Patron]);
        assert!(user.authorize(guards::DISCIPLINE).is_ok());
        assert!(user.authorize(guards::EXAMS).is_ok());
        let err = user.authorize(guards::ACCOUNTING).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_empty_guard_admits_anyone() {
        let user = auth_user(vec![]);
        assert!(user.authorize(guards::ANY).is_ok());
    }

    #[test]
    fn test_user_id_parses_subject() {
        let user = auth_user(vec![Role::Student]);
        assert!(user.user_id().is_ok());
        assert!(user.has_role(Role::Student));
        assert!(!user.has_role(Role::Parent));

        let mut broken = user.clone();
        broken.0.sub = "not-a-uuid".to_string();
        assert_eq!(broken.user_id().unwrap_err().status, StatusCode::UNAUTHORIZED);
    }
}
