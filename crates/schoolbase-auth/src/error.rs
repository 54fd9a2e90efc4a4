use schoolbase_core::AppError;
use thiserror::Error;

use crate::roles::Role;

/// Authorization failures raised by the role and scope checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Insufficient role")]
    Forbidden { required: Vec<Role> },

    #[error("{role} may only manage {gender} students")]
    GenderScope { role: Role, gender: &'static str },

    #[error("Student link not configured")]
    MissingStudentLink,

    #[error("Invalid gender: {0}")]
    InvalidGender(String),
}

impl AuthzError {
    /// Maps onto the HTTP error taxonomy. Unknown roles are caller input errors.
    pub fn into_app_error(self) -> AppError {
        match self {
            AuthzError::UnknownRole(_) | AuthzError::InvalidGender(_) => {
                AppError::unprocessable(anyhow::anyhow!(self.to_string()))
            }
            _ => AppError::forbidden(self.to_string()),
        }
    }
}
