/// Schema migrations
///
/// The SQL files in `taskdash-shared/migrations/` are embedded at compile time
/// and applied at startup. Already-applied files are skipped.

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{error, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending migration
///
/// # Errors
///
/// Fails if a migration does not execute or an applied file was edited
/// afterwards (checksum mismatch).
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(known = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_present() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert!(versions.len() >= 2, "users and tasks migrations expected");

        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted, "migrations must be ordered by version");
    }

    #[test]
    fn test_embedded_migrations_define_schema() {
        let sql: String = MIGRATOR.iter().map(|m| m.sql.to_string()).collect();

        assert!(sql.contains("CREATE TABLE users"));
        assert!(sql.contains("CREATE TABLE tasks"));
        assert!(sql.contains("ON DELETE CASCADE"));
    }
}
