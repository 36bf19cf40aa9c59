/// Postgres connection pool
///
/// The pool is the only state shared between requests. It is created once at
/// startup, checked with a `SELECT 1`, and closed after the server stops.
///
/// # Example
///
/// ```no_run
/// use taskdash_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?, 10)).await?;
///
///     let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
///         .fetch_one(&pool)
///         .await?;
///     println!("{} users", total);
///
///     Ok(())
/// }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Seconds to wait for a free connection before a query fails
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Connections are recycled after this long
const MAX_LIFETIME_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_url(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections: max_connections.max(1),
            acquire_timeout: Duration::from_secs(ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Overrides the acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Connects the pool and verifies the database answers
///
/// # Errors
///
/// Fails when the URL is malformed, the server is unreachable, or the
/// check query does not succeed.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(max_connections = config.max_connections, "Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!("Database pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
///
/// Used at startup and by `GET /health`.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    debug!("Database health check passed");
    Ok(())
}

pub async fn close_pool(pool: PgPool) {
    pool.close().await;
    info!("Database pool closed");
}
