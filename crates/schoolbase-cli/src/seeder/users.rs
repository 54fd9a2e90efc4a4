//! Accounts: one staff user per staff role, a portal account and a parent
//! for every student, plus the guardian links between them.

use fake::Fake;
use fake::faker::name::en::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use schoolbase_auth::Role;
use schoolbase_models::ids::{StudentId, UserId};

use super::models::{SEED_EMAIL_DOMAIN, UserSeed};

fn role_slug(role: Role) -> String {
    role.as_str()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// One account per staff role, e.g. `accountant@seed.schoolbase.test`.
pub fn generate_staff_users(password_hash: &str) -> Vec<UserSeed> {
    Role::ALL
        .iter()
        .copied()
        .filter(Role::is_staff)
        .map(|role| UserSeed {
            email: format!("{}@{}", role_slug(role), SEED_EMAIL_DOMAIN),
            full_name: format!("{} {}", FirstName().fake::<String>(), LastName().fake::<String>()),
            password_hash: password_hash.to_string(),
            role,
            student_id: None,
        })
        .collect()
}

/// A self-linked Student account and a Parent account per student.
pub fn generate_family_users(students: &[StudentId], password_hash: &str) -> Vec<UserSeed> {
    students
        .iter()
        .enumerate()
        .flat_map(|(idx, &student_id)| {
            let last_name: String = LastName().fake();
            [
                UserSeed {
                    email: format!("student{}@{}", idx + 1, SEED_EMAIL_DOMAIN),
                    full_name: format!("{} {}", FirstName().fake::<String>(), last_name),
                    password_hash: password_hash.to_string(),
                    role: Role::Student,
                    student_id: Some(student_id),
                },
                UserSeed {
                    email: format!("parent{}@{}", idx + 1, SEED_EMAIL_DOMAIN),
                    full_name: format!("{} {}", FirstName().fake::<String>(), last_name),
                    password_hash: password_hash.to_string(),
                    role: Role::Parent,
                    student_id: None,
                },
            ]
        })
        .collect()
}

/// Inserts users and their single role in one transaction.
pub async fn insert_users_batch(
    db: &PgPool,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    // 4 params per user
    const BATCH_SIZE: usize = 1000;

    let mut all_ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        let ids = insert_users_chunk(&mut tx, chunk).await?;
        let roles: Vec<(UserId, Role)> = ids
            .iter()
            .zip(chunk.iter())
            .map(|(id, seed)| (*id, seed.role))
            .collect();
        assign_roles_chunk(&mut tx, &roles).await?;
        all_ids.extend(ids);
    }

    tx.commit().await?;
    Ok(all_ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO users (email, full_name, hashed_password, student_id) VALUES ");
    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.student_id);
    }

    let ids: Vec<UserId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

async fn assign_roles_chunk(
    tx: &mut Transaction<'_, Postgres>,
    user_roles: &[(UserId, Role)],
) -> Result<(), Box<dyn std::error::Error>> {
    if user_roles.is_empty() {
        return Ok(());
    }

    let mut query = String::from("INSERT INTO user_roles (user_id, role) VALUES ");
    for i in 0..user_roles.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 2;
        query.push_str(&format!("(${}, ${})", p + 1, p + 2));
    }
    query.push_str(" ON CONFLICT (user_id, role) DO NOTHING");

    let mut q = sqlx::query(&query);
    for (user_id, role) in user_roles {
        q = q.bind(user_id).bind(role.as_str());
    }

    q.execute(&mut **tx).await?;
    Ok(())
}

/// Links each parent to the student generated alongside them.
pub async fn link_guardians(
    db: &PgPool,
    pairs: &[(UserId, StudentId)],
) -> Result<(), Box<dyn std::error::Error>> {
    if pairs.is_empty() {
        return Ok(());
    }

    let start_time = Instant::now();
    let (parents, students): (Vec<UserId>, Vec<StudentId>) = pairs.iter().copied().unzip();

    sqlx::query(
        r#"
        INSERT INTO guardian_links (parent_user_id, student_id)
        SELECT * FROM UNNEST($1::uuid[], $2::uuid[])
        "#,
    )
    .bind(parents)
    .bind(students)
    .execute(db)
    .await?;

    println!("   ✓ Linked {} guardians in {:?}", pairs.len(), start_time.elapsed());
    Ok(())
}

pub async fn create_admin(
    db: &PgPool,
    full_name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserId, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        r#"
        INSERT INTO users (email, full_name, hashed_password)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(email.trim().to_lowercase())
    .bind(full_name.trim())
    .bind(password_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        return Err("User with this email already exists".into());
    };

    assign_roles_chunk(&mut tx, &[(user_id, role)]).await?;
    tx.commit().await?;

    Ok(user_id)
}

pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM users WHERE email LIKE $1")
        .bind(format!("%@{SEED_EMAIL_DOMAIN}"))
        .execute(db)
        .await?
        .rows_affected();
    println!("   ✓ Deleted {} users", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_users_cover_staff_roles_only() {
        let users = generate_staff_users("hash");
        assert_eq!(users.len(), 11);
        assert!(users.iter().all(|u| u.role.is_staff()));
        assert!(users.iter().any(|u| u.email == "itsupport@seed.schoolbase.test"));
        assert!(
            users
                .iter()
                .any(|u| u.email == "registrarsecretary@seed.schoolbase.test")
        );
    }

    #[test]
    fn test_family_users_pair_student_and_parent() {
        let students = vec![StudentId::new(), StudentId::new()];
        let users = generate_family_users(&students, "hash");
        assert_eq!(users.len(), 4);
        assert_eq!(users[0].role, Role::Student);
        assert_eq!(users[0].student_id, Some(students[0]));
        assert_eq!(users[1].role, Role::Parent);
        assert_eq!(users[1].student_id, None);
    }
}
