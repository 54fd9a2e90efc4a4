//! Seed rows and the knobs that control how much demo data is generated.

use chrono::NaiveDate;

use schoolbase_auth::Role;
use schoolbase_models::ids::StudentId;

/// Admission numbers of generated students start with this prefix.
pub const SEED_ADMISSION_PREFIX: &str = "SEED-";

/// Generated accounts and teachers use this email domain.
pub const SEED_EMAIL_DOMAIN: &str = "seed.schoolbase.test";

/// Password shared by every generated account.
pub const SEED_PASSWORD: &str = "password123";

pub struct StudentSeed {
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: &'static str,
    pub date_of_birth: NaiveDate,
    pub class_name: String,
}

pub struct UserSeed {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    /// Self link for student-portal accounts.
    pub student_id: Option<StudentId>,
}

pub struct TeacherSeed {
    pub full_name: String,
    pub email: String,
    pub class_name: String,
    pub subject: String,
}

#[derive(Clone)]
pub struct SeedConfig {
    pub classes: Vec<String>,
    pub students_per_class: usize,
    pub subjects: Vec<String>,
    pub term: String,
    pub invoice_amount: f64,
}

impl SeedConfig {
    /// `class_count` classes named `Form 1A`, `Form 1B`, ...
    pub fn new(class_count: usize) -> Self {
        let classes = (0..class_count)
            .map(|i| {
                let form = i / 3 + 1;
                let stream = (b'A' + (i % 3) as u8) as char;
                format!("Form {form}{stream}")
            })
            .collect();

        Self {
            classes,
            students_per_class: 20,
            subjects: ["Mathematics", "English", "Biology", "History"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            term: "Term 1".to_string(),
            invoice_amount: 15_000.0,
        }
    }

    pub fn with_students_per_class(mut self, students: usize) -> Self {
        self.students_per_class = students;
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn total_students(&self) -> usize {
        self.classes.len() * self.students_per_class
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        let config = SeedConfig::new(4);
        assert_eq!(config.classes, vec!["Form 1A", "Form 1B", "Form 1C", "Form 2A"]);
    }

    #[test]
    fn test_total_students() {
        let config = SeedConfig::new(3).with_students_per_class(25);
        assert_eq!(config.total_students(), 75);
    }
}
