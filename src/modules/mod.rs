pub mod accounting;
pub mod applications;
pub mod attendance;
pub mod auth;
pub mod communication;
pub mod discipline;
pub mod exams;
pub mod fees;
pub mod grades;
pub mod notifications;
pub mod settings;
pub mod students;
pub mod teachers;
pub mod timetable;
pub mod users;

pub use self::auth::model::LoginRequest;
pub use self::users::model::User;
