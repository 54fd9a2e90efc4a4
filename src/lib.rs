//! # Schoolbase API
//!
//! School management backend built with Axum and PostgreSQL: admissions,
//! student records, attendance, exams and grading, fees and accounting,
//! timetabling, discipline, and guardian notifications.
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── schoolbase-core/     # AppError, pagination, CSV, password hashing
//! ├── schoolbase-config/   # Environment-driven configuration
//! ├── schoolbase-db/       # Pool, migrations, constraint helpers
//! ├── schoolbase-auth/     # Roles, guards, gender and self scope, JWT
//! ├── schoolbase-models/   # Rows, DTOs and the pure engines
//! └── schoolbase-cli/      # Admin CLI and demo seeder
//! src/
//! ├── jobs/                # Interval scheduler and fee sweeps
//! ├── middleware/          # AuthUser and guard extractors
//! ├── modules/             # Feature modules
//! ├── notifier/            # Guardian fan-out and SMTP delivery
//! └── settings_store.rs    # Versioned runtime settings
//! ```
//!
//! Each feature module follows the same layout:
//!
//! - `mod.rs`: module exports
//! - `controller.rs`: HTTP handlers
//! - `service.rs`: business logic and queries
//! - `model.rs`: re-exports of the rows and DTOs from `schoolbase-models`
//! - `router.rs`: Axum router
//!
//! ## Roles
//!
//! | Area | Roles |
//! |------|-------|
//! | Administration | IT Support, Headmaster, Director |
//! | Admissions | Registrar, Headmaster, Director, IT Support |
//! | Fees and accounting | Accountant (write), Headmaster and IT Support (read-only) |
//! | Discipline | Director of Discipline, Patron (male students), Matron (female students) |
//! | Student portal | Student, pinned to their own record |
//! | Guardians | Parent, per linked student and capability flag |
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod export;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod notifier;
pub mod router;
pub mod settings_store;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use schoolbase_auth;
pub use schoolbase_config;
pub use schoolbase_core;
pub use schoolbase_db;
pub use schoolbase_models;
