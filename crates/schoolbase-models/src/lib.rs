//! # Schoolbase Models
//!
//! Domain models and DTOs for the Schoolbase API.
//!
//! Alongside database rows and request/response types, this crate holds the
//! pure engines the services build on. None of them touch the database.
//!
//! # Modules
//!
//! - [`accounting`]: Expenses, payroll and financial projections
//! - [`applications`]: Admission applications and reference codes
//! - [`attendance`]: Attendance marks and streak compaction
//! - [`auth`]: Login request/response
//! - [`communication`]: Message templates and their rendering
//! - [`discipline`]: Disciplinary cases
//! - [`exams`]: Assessments and results
//! - [`fees`]: Invoices, payments, waivers and the ledger state machine
//! - [`grading`]: Class reports, progress series and report cards
//! - [`ids`]: Typed id newtypes
//! - [`notifications`]: Notifications, preferences and `should_send`
//! - [`settings`]: Versioned school settings
//! - [`students`]: Student records
//! - [`teachers`]: Teachers, assignments and teaching scope
//! - [`timetable`]: Timetable config, slots and conflict detection
//! - [`users`]: Users, role views and guardian links
//!
//! # Example
//!
//! ```ignore
//! use schoolbase_models::fees::{Ledger, InvoiceStatus};
//!
//! let mut ledger = Ledger::open(100.0)?;
//! ledger.apply_payment(30.0)?;
//! assert_eq!(ledger.status, InvoiceStatus::Partial);
//! ```

pub mod accounting;
pub mod applications;
pub mod attendance;
pub mod auth;
pub mod communication;
pub mod discipline;
pub mod exams;
pub mod fees;
pub mod grading;
pub mod ids;
pub mod notifications;
pub mod settings;
pub mod students;
pub mod teachers;
mod text_enum;
pub mod timetable;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use auth::{LoginRequest, LoginResponse, MessageResponse};
pub use fees::{InvoiceStatus, Ledger, LedgerError, PaymentStatus};
pub use notifications::{Channel, NotificationEvent, NotificationType, should_send};
pub use settings::{SchoolSettings, Versioned};
pub use timetable::{Conflict, ConflictKind, compute_conflicts};
pub use users::{User, UserWithRoles};
