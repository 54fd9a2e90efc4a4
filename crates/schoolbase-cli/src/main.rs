use std::process;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::postgres::{PgPool, PgPoolOptions};

use schoolbase_auth::Role;
use schoolbase_cli::seeder::{self, SeedConfig};

#[derive(Parser)]
#[command(name = "schoolbase-cli")]
#[command(about = "Schoolbase CLI - Administrative tools for Schoolbase", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a staff account with an administrative role
    CreateAdmin {
        /// Full name of the account holder
        #[arg(short = 'n', long)]
        full_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// Role to grant, e.g. "IT Support" or "Headmaster"
        #[arg(short = 'r', long, default_value = "IT Support")]
        role: String,
    },
    /// Seed the database with demo students, accounts, teachers, and invoices
    Seed {
        /// Number of classes to create students in
        #[arg(short = 'c', long, default_value = "6")]
        classes: usize,

        /// Number of students per class
        #[arg(short = 's', long, default_value = "25")]
        students: usize,

        /// Term label for the generated invoices
        #[arg(short = 't', long, default_value = "Term 1")]
        term: String,
    },
    /// Clear all seeded data (keeps accounts created with create-admin)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("❌ DATABASE_URL must be set");
            process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ Failed to connect to database: {}", e);
            process::exit(1);
        }
    };

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateAdmin {
            full_name,
            email,
            password,
            role,
        } => handle_create_admin(&pool, full_name, email, password, role).await,
        Commands::Seed {
            classes,
            students,
            term,
        } => handle_seed(&pool, classes, students, term).await,
        Commands::ClearSeed => handle_clear_seed(&pool).await,
    }
}

fn prompt_or_exit<T>(value: Result<T, dialoguer::Error>, what: &str) -> T {
    value.unwrap_or_else(|e| {
        eprintln!("❌ Failed to read {}: {}", what, e);
        process::exit(1);
    })
}

async fn handle_create_admin(
    pool: &PgPool,
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: String,
) {
    let role: Role = match role.parse() {
        Ok(role) => role,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    let full_name = full_name.unwrap_or_else(|| {
        prompt_or_exit(Input::new().with_prompt("Full name").interact_text(), "full name")
    });

    let email = email.unwrap_or_else(|| {
        prompt_or_exit(Input::new().with_prompt("Email address").interact_text(), "email")
    });

    let password = password.unwrap_or_else(|| {
        prompt_or_exit(
            Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords don't match")
                .interact(),
            "password",
        )
    });

    let hashed_password = match schoolbase_core::hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("\n❌ Failed to hash password: {}", e.error);
            process::exit(1);
        }
    };

    match seeder::create_admin(pool, &full_name, &email, &hashed_password, role).await {
        Ok(user_id) => {
            println!("\n✅ Account created successfully!");
            println!("   Id: {}", user_id);
            println!("   Email: {}", email);
            println!("   Name: {}", full_name);
            println!("   Role: {}", role);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating account: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_seed(pool: &PgPool, classes: usize, students: usize, term: String) {
    if classes == 0 {
        eprintln!("❌ At least one class is required");
        process::exit(1);
    }

    let config = SeedConfig::new(classes)
        .with_students_per_class(students)
        .with_term(term);

    match seeder::seed_all(pool, config).await {
        Ok(summary) => {
            println!("   Students: {}", summary.students);
            println!("   Accounts: {}", summary.users);
            println!("   Teachers: {}", summary.teachers);
            println!("   Invoices: {}", summary.invoices);
        }
        Err(e) => {
            eprintln!("\n❌ Error seeding database: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_clear_seed(pool: &PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        process::exit(1);
    }
}
