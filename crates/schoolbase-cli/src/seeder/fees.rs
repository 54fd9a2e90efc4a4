//! One term invoice per student, with a share already overdue.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::time::Instant;

use schoolbase_models::ids::StudentId;

use super::models::SeedConfig;

pub async fn seed_invoices(
    db: &PgPool,
    students: &[StudentId],
    config: &SeedConfig,
) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("💰 Seeding {} invoices for {}...", students.len(), config.term);

    let today = Utc::now().date_naive();
    // Every fourth invoice falls due in the past so the overdue sweep has work.
    let due_dates: Vec<_> = (0..students.len())
        .map(|i| {
            if i % 4 == 0 {
                today - Duration::days(10)
            } else {
                today + Duration::days(30)
            }
        })
        .collect();

    let inserted = sqlx::query(
        r#"
        INSERT INTO fee_invoices (student_id, term, amount, balance, status, due_date, description)
        SELECT student_id, $3, $4, $4, 'unpaid', due_date, 'Tuition and boarding'
        FROM UNNEST($1::uuid[], $2::date[]) AS t(student_id, due_date)
        "#,
    )
    .bind(students.to_vec())
    .bind(due_dates)
    .bind(&config.term)
    .bind(config.invoice_amount)
    .execute(db)
    .await?
    .rows_affected();

    println!("   ✓ Inserted {} invoices in {:?}", inserted, start_time.elapsed());
    Ok(inserted)
}
