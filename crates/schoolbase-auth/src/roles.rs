//! Closed role catalogue and set-intersection authorization.
//!
//! Roles are a fixed enumeration rather than free-text names. Stored and
//! transmitted names are parsed through [`Role::from_str`], which folds the
//! known synonyms ("Secretary", "Registrar") onto a single variant.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthzError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Student,
    Parent,
    Teacher,
    Headmaster,
    Director,
    Dean,
    DirectorOfStudies,
    DirectorOfDiscipline,
    Accountant,
    Registrar,
    Patron,
    Matron,
    ItSupport,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::Student,
        Role::Parent,
        Role::Teacher,
        Role::Headmaster,
        Role::Director,
        Role::Dean,
        Role::DirectorOfStudies,
        Role::DirectorOfDiscipline,
        Role::Accountant,
        Role::Registrar,
        Role::Patron,
        Role::Matron,
        Role::ItSupport,
    ];

    /// Canonical display name, as stored in `user_roles.role`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Parent => "Parent",
            Role::Teacher => "Teacher",
            Role::Headmaster => "Headmaster",
            Role::Director => "Director",
            Role::Dean => "Dean",
            Role::DirectorOfStudies => "Director of Studies",
            Role::DirectorOfDiscipline => "Director of Discipline",
            Role::Accountant => "Accountant",
            Role::Registrar => "Registrar/Secretary",
            Role::Patron => "Patron",
            Role::Matron => "Matron",
            Role::ItSupport => "IT Support",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Student => "Student portal access to own records",
            Role::Parent => "Guardian access to linked students",
            Role::Teacher => "Grade entry and attendance for assigned classes",
            Role::Headmaster => "School-wide oversight",
            Role::Director => "Executive oversight and approvals",
            Role::Dean => "Academic oversight",
            Role::DirectorOfStudies => "Curriculum, exams and timetabling",
            Role::DirectorOfDiscipline => "Disciplinary case management",
            Role::Accountant => "Fees, expenses and payroll",
            Role::Registrar => "Admissions and student records",
            Role::Patron => "Boarding supervision for male students",
            Role::Matron => "Boarding supervision for female students",
            Role::ItSupport => "System administration",
        }
    }

    /// Staff roles are every role except the two portal roles.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Student | Role::Parent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        let role = match normalized.as_str() {
            "student" => Role::Student,
            "parent" | "guardian" => Role::Parent,
            "teacher" => Role::Teacher,
            "headmaster" | "principal" => Role::Headmaster,
            "director" => Role::Director,
            "dean" => Role::Dean,
            "directorofstudies" | "dos" => Role::DirectorOfStudies,
            "directorofdiscipline" => Role::DirectorOfDiscipline,
            "accountant" => Role::Accountant,
            "registrarsecretary" | "registrar" | "secretary" => Role::Registrar,
            "patron" => Role::Patron,
            "matron" => Role::Matron,
            "itsupport" | "it" => Role::ItSupport,
            _ => return Err(AuthzError::UnknownRole(s.to_string())),
        };
        Ok(role)
    }
}

impl TryFrom<String> for Role {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// The unordered, duplicate-free set of roles held by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn intersects(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.0.contains(r))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.to_string()).collect()
    }

    /// Parses stored role names, skipping (and reporting) unknown ones.
    pub fn from_names<I, S>(names: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match name.as_ref().parse::<Role>() {
                Ok(role) => {
                    set.insert(role);
                }
                Err(_) => unknown.push(name.as_ref().to_string()),
            }
        }
        (Self(set), unknown)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Grants access when the caller's roles intersect `allowed`.
///
/// An empty `allowed` slice admits any authenticated caller.
pub fn authorize(user_roles: &RoleSet, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.is_empty() || user_roles.intersects(allowed) {
        return Ok(());
    }
    Err(AuthzError::Forbidden {
        required: allowed.to_vec(),
    })
}

/// Role groups guarding each functional area.
pub mod guards {
    use super::Role::{self, *};

    pub const ANY: &[Role] = &[];
    pub const STUDENT_PORTAL: &[Role] = &[Student];
    pub const ADMIN: &[Role] = &[ItSupport, Headmaster, Director];
    pub const STUDENT_RECORDS: &[Role] = &[Teacher, Headmaster, Director, Registrar, ItSupport];
    pub const ADMISSIONS: &[Role] = &[Registrar, Headmaster, Director, ItSupport];
    pub const ATTENDANCE: &[Role] = &[Teacher, Registrar, Headmaster, Dean, DirectorOfStudies, ItSupport];
    pub const TEACHERS: &[Role] = &[Headmaster, Director, Dean, DirectorOfStudies, Registrar, ItSupport];
    pub const EXAMS: &[Role] = &[
        Teacher,
        Headmaster,
        Director,
        Dean,
        DirectorOfStudies,
        Registrar,
        ItSupport,
    ];
    pub const TIMETABLE: &[Role] = &[Headmaster, Dean, DirectorOfStudies, ItSupport];
    pub const ACCOUNTING: &[Role] = &[Accountant, Headmaster, ItSupport];
    pub const ACCOUNTING_WRITE: &[Role] = &[Accountant];
    pub const DISCIPLINE: &[Role] = &[
        DirectorOfDiscipline,
        Patron,
        Matron,
        Dean,
        DirectorOfStudies,
        Headmaster,
        ItSupport,
    ];
    pub const DISCIPLINE_WRITE: &[Role] = &[DirectorOfDiscipline, Patron, Matron, Headmaster, ItSupport];
    pub const SETTINGS_WRITE: &[Role] = &[Headmaster, ItSupport];
    pub const COMMUNICATION: &[Role] = &[Registrar, Headmaster, ItSupport];
    pub const STAFF: &[Role] = &[
        Teacher,
        Headmaster,
        Director,
        Dean,
        DirectorOfStudies,
        DirectorOfDiscipline,
        Accountant,
        Registrar,
        Patron,
        Matron,
        ItSupport,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_registrar_synonyms_collapse() {
        assert_eq!("Secretary".parse::<Role>().unwrap(), Role::Registrar);
        assert_eq!("Registrar/Secretary".parse::<Role>().unwrap(), Role::Registrar);
        assert_eq!("registrar".parse::<Role>().unwrap(), Role::Registrar);
    }

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        assert_eq!("director of studies".parse::<Role>().unwrap(), Role::DirectorOfStudies);
        assert_eq!("IT SUPPORT".parse::<Role>().unwrap(), Role::ItSupport);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(matches!(
            "Janitor".parse::<Role>(),
            Err(AuthzError::UnknownRole(name)) if name == "Janitor"
        ));
    }

    #[test]
    fn test_serde_uses_display_name() {
        let json = serde_json::to_string(&Role::DirectorOfDiscipline).unwrap();
        assert_eq!(json, r#""Director of Discipline""#);
        let back: Role = serde_json::from_str(r#""Secretary""#).unwrap();
        assert_eq!(back, Role::Registrar);
    }

    #[test]
    fn test_authorize_intersection() {
        let roles: RoleSet = [Role::Teacher, Role::Patron].into_iter().collect();
        assert!(authorize(&roles, guards::DISCIPLINE).is_ok());
        assert!(authorize(&roles, guards::EXAMS).is_ok());
        assert!(matches!(
            authorize(&roles, guards::ACCOUNTING),
            Err(AuthzError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_authorize_empty_allowed_admits_anyone() {
        assert!(authorize(&RoleSet::new(), guards::ANY).is_ok());
    }

    #[test]
    fn test_authorize_no_roles_denied() {
        assert!(authorize(&RoleSet::new(), guards::STUDENT_PORTAL).is_err());
    }

    #[test]
    fn test_role_set_deduplicates() {
        let roles: RoleSet = [Role::Dean, Role::Dean, Role::Teacher].into_iter().collect();
        assert_eq!(roles.names(), vec!["Teacher".to_string(), "Dean".to_string()]);
    }

    #[test]
    fn test_from_names_reports_unknown() {
        let (roles, unknown) = RoleSet::from_names(["Accountant", "Wizard", "secretary"]);
        assert!(roles.contains(Role::Accountant));
        assert!(roles.contains(Role::Registrar));
        assert_eq!(unknown, vec!["Wizard".to_string()]);
    }

    #[test]
    fn test_dean_cannot_write_discipline() {
        let roles: RoleSet = [Role::Dean].into_iter().collect();
        assert!(authorize(&roles, guards::DISCIPLINE).is_ok());
        assert!(authorize(&roles, guards::DISCIPLINE_WRITE).is_err());
    }

    #[test]
    fn test_staff_flag() {
        assert!(!Role::Student.is_staff());
        assert!(!Role::Parent.is_staff());
        assert!(Role::Matron.is_staff());
    }
}
