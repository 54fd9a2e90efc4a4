use serde::Serialize;
use utoipa::ToSchema;

pub use schoolbase_models::applications::{
    Application, ApplicationFilterParams, ApplicationStatus, ApplicationStatusView,
    ApproveApplicationDto, CreateApplicationDto, RejectApplicationDto, generate_reference,
};
use schoolbase_models::students::Student;

/// Result of approving an application: the decided application and the student it created.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalOutcome {
    pub application: Application,
    pub student: Student,
}
