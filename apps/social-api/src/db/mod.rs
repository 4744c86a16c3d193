pub mod kv;
pub mod pool;
pub mod schema;

use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Apply pending migrations and return the names of those applied.
pub fn run_migrations(
    database_url: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = PgConnection::establish(database_url)?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    Ok(applied.iter().map(ToString::to_string).collect())
}

/// Swap the database name for `<name>_test`, keeping any query string.
pub fn test_database_url(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };
    let Some((prefix, db_name)) = base.rsplit_once('/') else {
        return database_url.to_string();
    };
    if db_name.is_empty() || db_name.ends_with("_test") {
        return database_url.to_string();
    }

    match query {
        Some(query) => format!("{prefix}/{db_name}_test?{query}"),
        None => format!("{prefix}/{db_name}_test"),
    }
}

#[cfg(test)]
mod tests {
    use super::test_database_url;

    #[test]
    fn appends_test_suffix() {
        assert_eq!(
            test_database_url("postgres://u:p@localhost/social"),
            "postgres://u:p@localhost/social_test"
        );
    }

    #[test]
    fn keeps_query_string() {
        assert_eq!(
            test_database_url("postgres://localhost/social?sslmode=disable"),
            "postgres://localhost/social_test?sslmode=disable"
        );
    }

    #[test]
    fn already_test_is_unchanged() {
        assert_eq!(
            test_database_url("postgres://localhost/social_test"),
            "postgres://localhost/social_test"
        );
    }
}
