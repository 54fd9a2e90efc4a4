//! JWT claim structure for access tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::{Role, RoleSet};

/// Claims embedded in every access token.
///
/// Roles travel with the token so route guards can authorize without a
/// database lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued-at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn role_set(&self) -> RoleSet {
        self.roles.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialize_role_names() {
        let claims = Claims {
            sub: "user-id-123".to_string(),
            email: "test@example.com".to_string(),
            roles: vec![Role::Registrar],
            exp: 1234567890,
            iat: 1234567800,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""sub":"user-id-123""#));
        assert!(serialized.contains(r#""roles":["Registrar/Secretary"]"#));
    }

    #[test]
    fn test_claims_deserialize_synonyms() {
        let json = r#"{"sub":"user-id-456","email":"user@test.com","roles":["Secretary","DOS"],"exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.roles, vec![Role::Registrar, Role::DirectorOfStudies]);
        assert!(claims.user_id().is_none());
    }

    #[test]
    fn test_role_set_from_claims() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "x@test.com".to_string(),
            roles: vec![Role::Teacher, Role::Teacher, Role::Dean],
            exp: 0,
            iat: 0,
        };
        assert_eq!(claims.role_set().names().len(), 2);
        assert!(claims.user_id().is_some());
    }
}
