//! Teachers and their (class, subject) assignments.
//!
//! Teacher records are matched to login accounts by email; assignments drive
//! which assessments a teaching user may see and grade.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AssignmentId, TeacherId};

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TeacherFilterParams {
    /// Matches name or email, case-insensitive.
    pub q: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TeacherAssignment {
    pub id: AssignmentId,
    pub teacher_id: TeacherId,
    pub class_name: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    pub teacher_id: TeacherId,
    #[validate(length(min = 1, max = 50))]
    pub class_name: String,
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AssignmentFilterParams {
    #[serde(default, deserialize_with = "schoolbase_core::serde::empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub teacher_id: Option<TeacherId>,
    pub class_name: Option<String>,
    pub subject: Option<String>,
}

/// The (class, subject) pairs a teaching user may act on.
///
/// `Unrestricted` applies to callers without the Teacher role. A teaching
/// caller with no matching Teacher record gets an empty set, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeachingScope {
    Unrestricted,
    Pairs(HashSet<(String, String)>),
}

impl TeachingScope {
    pub fn from_assignments<'a, I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = &'a TeacherAssignment>,
    {
        TeachingScope::Pairs(
            assignments
                .into_iter()
                .map(|a| (a.class_name.clone(), a.subject.clone()))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        TeachingScope::Pairs(HashSet::new())
    }

    /// Whether an assessment for `class_name`/`subject` is visible. Unscoped
    /// assessments (no class or no subject) are only visible unrestricted.
    pub fn allows(&self, class_name: Option<&str>, subject: Option<&str>) -> bool {
        match self {
            TeachingScope::Unrestricted => true,
            TeachingScope::Pairs(pairs) => match (class_name, subject) {
                (Some(c), Some(s)) => pairs.contains(&(c.to_string(), s.to_string())),
                _ => false,
            },
        }
    }

    /// Splits the allowed pairs into parallel arrays for an `UNNEST` filter.
    pub fn as_arrays(&self) -> Option<(Vec<String>, Vec<String>)> {
        match self {
            TeachingScope::Unrestricted => None,
            TeachingScope::Pairs(pairs) => Some(pairs.iter().cloned().unzip()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(class_name: &str, subject: &str) -> TeacherAssignment {
        TeacherAssignment {
            id: AssignmentId::new(),
            teacher_id: TeacherId::new(),
            class_name: class_name.to_string(),
            subject: subject.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_scope_matches_exact_pairs() {
        let list = [assignment("Form 1", "Maths"), assignment("Form 2", "Physics")];
        let scope = TeachingScope::from_assignments(&list);
        assert!(scope.allows(Some("Form 1"), Some("Maths")));
        assert!(!scope.allows(Some("Form 1"), Some("Physics")));
        assert!(!scope.allows(None, Some("Maths")));
    }

    #[test]
    fn test_empty_scope_allows_nothing() {
        assert!(!TeachingScope::empty().allows(Some("Form 1"), Some("Maths")));
        assert_eq!(TeachingScope::empty().as_arrays(), Some((vec![], vec![])));
    }

    #[test]
    fn test_unrestricted_allows_everything() {
        assert!(TeachingScope::Unrestricted.allows(None, None));
        assert!(TeachingScope::Unrestricted.as_arrays().is_none());
    }
}
