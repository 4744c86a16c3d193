//! Applies the embedded notification schema migrations.
//!
//! Usage:
//!   cargo run -p social-api --bin social-migrate
//!   cargo run -p social-api --bin social-migrate -- --test
//!
//! `--test` targets the `<db>_test` database next to `DATABASE_URL`.

use std::path::Path;
use std::process::ExitCode;

use social_api::db::{run_migrations, test_database_url};

fn main() -> ExitCode {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }

    let Ok(mut database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; nothing to migrate (the server falls back to memory)");
        return ExitCode::FAILURE;
    };
    if std::env::args().any(|arg| arg == "--test") {
        database_url = test_database_url(&database_url);
    }

    match run_migrations(&database_url) {
        Ok(applied) if applied.is_empty() => println!("No pending migrations."),
        Ok(applied) => {
            for migration in &applied {
                println!("  Applied: {migration}");
            }
            println!("{} migration(s) applied.", applied.len());
        }
        Err(e) => {
            eprintln!("migration failed: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
