//! Users, role assignment and student links.
//!
//! A user may be linked to at most one student as that student's own portal
//! account, and to any number of students as a guardian. Guardian links carry
//! per-student capability flags that gate what the guardian can see and which
//! notifications they receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use schoolbase_auth::{Role, RoleSet};
use schoolbase_core::PaginationParams;
use schoolbase_core::serde::empty_string_as_none;

use crate::ids::{GuardianLinkId, StudentId, UserId};
use crate::notifications::NotificationType;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithRoles {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    #[schema(value_type = Vec<String>, example = json!(["Accountant"]))]
    pub roles: Vec<Role>,
    /// The student this account belongs to, for student-portal users.
    pub student_id: Option<StudentId>,
    pub created_at: DateTime<Utc>,
}

impl UserWithRoles {
    pub fn new(user: User, roles: RoleSet, student_id: Option<StudentId>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            roles: roles.iter().copied().collect(),
            student_id,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleInfo {
    pub name: String,
    pub description: String,
}

impl From<Role> for RoleInfo {
    fn from(role: Role) -> Self {
        Self {
            name: role.to_string(),
            description: role.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(length(min = 8))]
    pub password: String,
    /// Role names; synonyms such as "Secretary" are accepted.
    #[serde(default)]
    pub role_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the full role set when present.
    pub role_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserFilterParams {
    /// Matches email or full name, case-insensitive.
    pub search: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Parses role names, rejecting the whole list if any name is unknown.
pub fn parse_role_names(names: &[String]) -> Result<RoleSet, Vec<String>> {
    let (roles, unknown) = RoleSet::from_names(names);
    if unknown.is_empty() {
        Ok(roles)
    } else {
        Err(unknown)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetStudentLinkDto {
    /// `null` removes the link.
    pub student_id: Option<StudentId>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct GuardianLink {
    pub id: GuardianLinkId,
    pub parent_user_id: UserId,
    pub student_id: StudentId,
    pub can_access_grades: bool,
    pub can_access_attendance: bool,
    pub can_access_fees: bool,
    pub can_access_disciplinary: bool,
    pub created_at: DateTime<Utc>,
}

impl GuardianLink {
    /// Whether this link lets the guardian receive notifications of `kind`.
    ///
    /// Timetable and announcement notices are not student-private and pass
    /// on any link.
    pub fn permits(&self, kind: NotificationType) -> bool {
        match kind {
            NotificationType::GradeUpdated => self.can_access_grades,
            NotificationType::AttendanceMarked => self.can_access_attendance,
            NotificationType::FeeReminder | NotificationType::FeePaymentConfirmed => {
                self.can_access_fees
            }
            NotificationType::DisciplinaryCase => self.can_access_disciplinary,
            NotificationType::TimetableUpdated | NotificationType::GeneralAnnouncement => true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGuardianLinkDto {
    pub student_id: StudentId,
    #[serde(default = "default_true")]
    pub can_access_grades: bool,
    #[serde(default = "default_true")]
    pub can_access_attendance: bool,
    #[serde(default = "default_true")]
    pub can_access_fees: bool,
    #[serde(default = "default_true")]
    pub can_access_disciplinary: bool,
}

/// A linked student as seen by their guardian.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct LinkedStudent {
    pub id: StudentId,
    pub admission_no: String,
    pub full_name: String,
    pub class_name: Option<String>,
    pub can_access_grades: bool,
    pub can_access_attendance: bool,
    pub can_access_fees: bool,
    pub can_access_disciplinary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(grades: bool, fees: bool) -> GuardianLink {
        GuardianLink {
            id: GuardianLinkId::new(),
            parent_user_id: UserId::new(),
            student_id: StudentId::new(),
            can_access_grades: grades,
            can_access_attendance: true,
            can_access_fees: fees,
            can_access_disciplinary: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_link_capabilities_gate_types() {
        let l = link(false, true);
        assert!(!l.permits(NotificationType::GradeUpdated));
        assert!(l.permits(NotificationType::FeeReminder));
        assert!(l.permits(NotificationType::FeePaymentConfirmed));
        assert!(l.permits(NotificationType::GeneralAnnouncement));
    }

    #[test]
    fn test_parse_role_names_rejects_unknown() {
        let err = parse_role_names(&["Teacher".into(), "Bursar".into()]).unwrap_err();
        assert_eq!(err, vec!["Bursar".to_string()]);
    }

    #[test]
    fn test_parse_role_names_merges_synonyms() {
        let roles = parse_role_names(&["Secretary".into(), "Registrar/Secretary".into()]).unwrap();
        assert_eq!(roles.names(), vec!["Registrar/Secretary".to_string()]);
    }

    #[test]
    fn test_create_user_requires_long_password() {
        let dto = CreateUserDto {
            email: "t@school.test".into(),
            full_name: None,
            password: "short".into(),
            role_names: vec![],
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_guardian_link_defaults_grant_everything() {
        let dto: CreateGuardianLinkDto = serde_json::from_str(&format!(
            r#"{{"student_id":"{}"}}"#,
            uuid::Uuid::new_v4()
        ))
        .unwrap();
        assert!(dto.can_access_grades && dto.can_access_fees);
    }
}
