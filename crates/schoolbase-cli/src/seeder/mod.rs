//! Demo data for local development.
//!
//! Generated rows are recognisable by the `SEED-` admission prefix and the
//! `seed.schoolbase.test` email domain, which is what the clear commands
//! delete by.

mod academics;
mod fees;
mod models;
mod students;
mod users;

use std::time::Instant;

use sqlx::PgPool;

use schoolbase_models::ids::UserId;

pub use models::{SEED_ADMISSION_PREFIX, SEED_EMAIL_DOMAIN, SEED_PASSWORD, SeedConfig};
pub use users::create_admin;

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub students: usize,
    pub users: usize,
    pub teachers: usize,
    pub invoices: u64,
}

pub async fn seed_all(
    db: &PgPool,
    config: SeedConfig,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🌱 Starting database seeding...");
    println!("   - Classes: {}", config.classes.join(", "));
    println!("   - Students per class: {}", config.students_per_class);

    // One hash for every account keeps seeding fast
    let password_hash = schoolbase_core::hash_password(SEED_PASSWORD)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let student_ids = students::seed_students(db, &config).await?;

    let staff = users::generate_staff_users(&password_hash);
    let family = users::generate_family_users(&student_ids, &password_hash);
    println!("👥 Seeding {} accounts...", staff.len() + family.len());
    let staff_ids = users::insert_users_batch(db, &staff).await?;
    let family_ids = users::insert_users_batch(db, &family).await?;

    // Family accounts come in (student, parent) pairs
    let parent_links: Vec<(UserId, _)> = family_ids
        .chunks(2)
        .zip(student_ids.iter())
        .filter_map(|(pair, student_id)| pair.get(1).map(|parent| (*parent, *student_id)))
        .collect();
    users::link_guardians(db, &parent_links).await?;

    let teachers = academics::generate_teachers(&config);
    let teacher_accounts: Vec<_> = teachers
        .iter()
        .map(|t| models::UserSeed {
            email: t.email.clone(),
            full_name: t.full_name.clone(),
            password_hash: password_hash.clone(),
            role: schoolbase_auth::Role::Teacher,
            student_id: None,
        })
        .collect();
    let teacher_account_ids = users::insert_users_batch(db, &teacher_accounts).await?;
    let teacher_count = academics::seed_teachers(db, &teachers).await?;

    let invoices = fees::seed_invoices(db, &student_ids, &config).await?;

    let summary = SeedSummary {
        students: student_ids.len(),
        users: staff_ids.len() + family_ids.len() + teacher_account_ids.len(),
        teachers: teacher_count,
        invoices,
    };

    println!("\n✅ Seeding completed in {:?}", start_time.elapsed());
    println!("   Password for every seeded account: {}", SEED_PASSWORD);
    Ok(summary)
}

pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded data...");

    academics::clear_teachers(db).await?;
    users::clear_users(db).await?;
    students::clear_students(db).await?;

    println!("✅ Cleared seeded data in {:?}", start_time.elapsed());
    Ok(())
}
