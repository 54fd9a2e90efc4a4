//! Student records spread across the configured classes.

use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::name::en::*;
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use schoolbase_models::ids::StudentId;

use super::models::{SEED_ADMISSION_PREFIX, SeedConfig, StudentSeed};

pub fn generate_students(config: &SeedConfig) -> Vec<StudentSeed> {
    let mut rng = rand::thread_rng();
    let earliest = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or_default();

    config
        .classes
        .iter()
        .enumerate()
        .flat_map(|(class_idx, class_name)| {
            (0..config.students_per_class)
                .map(|i| {
                    let gender = if rng.gen_bool(0.5) { "Male" } else { "Female" };
                    StudentSeed {
                        admission_no: format!(
                            "{}{:03}{:04}",
                            SEED_ADMISSION_PREFIX,
                            class_idx + 1,
                            i + 1
                        ),
                        first_name: FirstName().fake(),
                        last_name: LastName().fake(),
                        gender,
                        date_of_birth: earliest + Duration::days(rng.gen_range(0..1500)),
                        class_name: class_name.clone(),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_students(
    db: &PgPool,
    config: &SeedConfig,
) -> Result<Vec<StudentId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🎓 Seeding {} students ({} per class)...",
        config.total_students(),
        config.students_per_class
    );

    let students = generate_students(config);

    let mut tx = db.begin().await?;
    // 6 params per student
    const BATCH_SIZE: usize = 1000;
    let mut ids = Vec::with_capacity(students.len());
    for chunk in students.chunks(BATCH_SIZE) {
        ids.extend(insert_students_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!("   ✓ Inserted {} students in {:?}", ids.len(), start_time.elapsed());
    Ok(ids)
}

async fn insert_students_chunk(
    tx: &mut Transaction<'_, Postgres>,
    students: &[StudentSeed],
) -> Result<Vec<StudentId>, Box<dyn std::error::Error>> {
    if students.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO students (admission_no, first_name, last_name, gender, date_of_birth, class_name) VALUES ",
    );
    for i in 0..students.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 6;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6
        ));
    }
    query.push_str(" ON CONFLICT (admission_no) DO NOTHING RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for s in students {
        q = q
            .bind(&s.admission_no)
            .bind(&s.first_name)
            .bind(&s.last_name)
            .bind(s.gender)
            .bind(s.date_of_birth)
            .bind(&s.class_name);
    }

    let ids: Vec<StudentId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Deletes generated students; invoices, attendance and links cascade.
pub async fn clear_students(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM students WHERE admission_no LIKE $1")
        .bind(format!("{SEED_ADMISSION_PREFIX}%"))
        .execute(db)
        .await?
        .rows_affected();
    println!("   ✓ Deleted {} students", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_students_fills_every_class() {
        let config = SeedConfig::new(2).with_students_per_class(3);
        let students = generate_students(&config);
        assert_eq!(students.len(), 6);
        assert_eq!(students.iter().filter(|s| s.class_name == "Form 1B").count(), 3);
        assert!(students.iter().all(|s| s.admission_no.starts_with(SEED_ADMISSION_PREFIX)));
    }

    #[test]
    fn test_admission_numbers_are_unique() {
        let config = SeedConfig::new(3).with_students_per_class(10);
        let mut numbers: Vec<_> = generate_students(&config)
            .into_iter()
            .map(|s| s.admission_no)
            .collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 30);
    }
}
