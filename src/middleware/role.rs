//! Role checks that are not expressed as extractors.
//!
//! - [`require_admin`]: route layer for whole admin routers
//! - [`ensure_accounting_write`]: splits the accounting guard into its
//!   writing role and the read-only oversight roles

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use schoolbase_auth::{Role, guards};
use schoolbase_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Checks the caller against `allowed` before running the inner service.
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed: &'static [Role],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;
    auth_user.authorize(allowed)?;

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// ```rust,ignore
/// let routes = Router::new()
///     .route("/", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
/// ```
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, guards::ADMIN).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Oversight roles may read the ledger but not change it.
pub fn ensure_accounting_write(auth_user: &AuthUser) -> Result<(), AppError> {
    if auth_user.roles().intersects(guards::ACCOUNTING_WRITE) {
        return Ok(());
    }
    Err(AppError::forbidden("Read-only role"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use schoolbase_auth::Claims;

    fn auth_user(roles: Vec<Role>) -> AuthUser {
        AuthUser(Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: "finance@example.com".to_string(),
            roles,
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_accountant_may_write() {
        assert!(ensure_accounting_write(&auth_user(vec![Role::Accountant])).is_ok());
    }

    #[test]
    fn test_oversight_roles_are_read_only() {
        for role in [Role::Headmaster, Role::ItSupport] {
            let err = ensure_accounting_write(&auth_user(vec![role])).unwrap_err();
            assert_eq!(err.status, StatusCode::FORBIDDEN);
            assert_eq!(err.error.to_string(), "Read-only role");
        }
    }
}
