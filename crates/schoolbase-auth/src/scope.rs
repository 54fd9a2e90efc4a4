//! Resource-dependent checks applied after role authorization succeeds.
//!
//! [`check_gender_scope`] narrows the dormitory supervisor roles to students of
//! one gender. Callers resolve the owning student on every call and pass its
//! current gender in; nothing here caches a decision.
//!
//! [`resolve_self_student`] pins student-portal callers to their own linked
//! student regardless of any id they supplied.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::AuthzError;
use crate::roles::{Role, RoleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(AuthzError::InvalidGender(s.to_string())),
        }
    }
}

/// Gender each scoped supervisor role is limited to.
const SCOPED_ROLES: [(Role, Gender); 2] = [(Role::Patron, Gender::Male), (Role::Matron, Gender::Female)];

/// Returns true when any held role carries a gender restriction.
pub fn has_gender_scope(roles: &RoleSet) -> bool {
    SCOPED_ROLES.iter().any(|(role, _)| roles.contains(*role))
}

/// Checks a scoped caller against the owning student's current gender.
///
/// Callers holding neither Patron nor Matron pass unconditionally. A scoped
/// role applies even when other roles are also held. A caller holding both
/// scoped roles may act on either gender. A missing or unrecognised student
/// gender fails for scoped callers.
pub fn check_gender_scope(roles: &RoleSet, student_gender: Option<&str>) -> Result<(), AuthzError> {
    let held: Vec<(Role, Gender)> = SCOPED_ROLES
        .iter()
        .copied()
        .filter(|(role, _)| roles.contains(*role))
        .collect();

    let Some(&(first_role, first_gender)) = held.first() else {
        return Ok(());
    };

    let gender = student_gender.and_then(|g| g.parse::<Gender>().ok());
    if let Some(gender) = gender {
        if held.iter().any(|(_, allowed)| *allowed == gender) {
            return Ok(());
        }
    }

    Err(AuthzError::GenderScope {
        role: first_role,
        gender: first_gender.as_str(),
    })
}

/// Picks the student id a personal endpoint operates on.
///
/// Student-role callers always get their own linked id; the requested id is
/// ignored. Other callers get the requested id back unchanged.
pub fn resolve_self_student(
    roles: &RoleSet,
    linked_student: Option<Uuid>,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, AuthzError> {
    if roles.contains(Role::Student) {
        return linked_student.map(Some).ok_or(AuthzError::MissingStudentLink);
    }
    Ok(requested)
}
