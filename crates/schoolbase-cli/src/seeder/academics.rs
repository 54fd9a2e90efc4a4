//! Teacher records with one (class, subject) assignment each.
//!
//! Every teacher's email matches a Teacher-role account so the teaching
//! scope resolves when they log in.

use fake::Fake;
use fake::faker::name::en::*;
use sqlx::PgPool;
use std::time::Instant;

use super::models::{SEED_EMAIL_DOMAIN, SeedConfig, TeacherSeed};

pub fn generate_teachers(config: &SeedConfig) -> Vec<TeacherSeed> {
    let mut teachers = Vec::with_capacity(config.classes.len() * config.subjects.len());
    for (class_idx, class_name) in config.classes.iter().enumerate() {
        for (subject_idx, subject) in config.subjects.iter().enumerate() {
            teachers.push(TeacherSeed {
                full_name: format!("{} {}", FirstName().fake::<String>(), LastName().fake::<String>()),
                email: format!("teacher{}-{}@{}", class_idx + 1, subject_idx + 1, SEED_EMAIL_DOMAIN),
                class_name: class_name.clone(),
                subject: subject.clone(),
            });
        }
    }
    teachers
}

pub async fn seed_teachers(
    db: &PgPool,
    teachers: &[TeacherSeed],
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🧑‍🏫 Seeding {} teachers with assignments...", teachers.len());

    let mut tx = db.begin().await?;
    for t in teachers {
        sqlx::query(
            r#"
            WITH teacher AS (
                INSERT INTO teachers (full_name, email)
                VALUES ($1, $2)
                RETURNING id
            )
            INSERT INTO teacher_assignments (teacher_id, class_name, subject)
            SELECT id, $3, $4 FROM teacher
            "#,
        )
        .bind(&t.full_name)
        .bind(&t.email)
        .bind(&t.class_name)
        .bind(&t.subject)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    println!("   ✓ Inserted {} teachers in {:?}", teachers.len(), start_time.elapsed());
    Ok(teachers.len())
}

pub async fn clear_teachers(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM teachers WHERE email LIKE $1")
        .bind(format!("%@{SEED_EMAIL_DOMAIN}"))
        .execute(db)
        .await?
        .rows_affected();
    println!("   ✓ Deleted {} teachers", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_teacher_per_class_subject() {
        let config = SeedConfig::new(2);
        let teachers = generate_teachers(&config);
        assert_eq!(teachers.len(), 2 * config.subjects.len());
        let mut emails: Vec<_> = teachers.iter().map(|t| t.email.clone()).collect();
        emails.dedup();
        assert_eq!(emails.len(), teachers.len());
    }
}
