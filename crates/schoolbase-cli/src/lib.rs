//! # Schoolbase CLI
//!
//! Administrative commands and demo data seeding for Schoolbase.
//!
//! ## Usage
//!
//! ```ignore
//! use schoolbase_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3).with_students_per_class(20);
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
