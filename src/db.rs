//! PostgreSQL pool and embedded migrations.
//!
//! One pool is shared by the HTTP handlers and both background workers, so
//! its size bounds the database concurrency of the whole process.

use std::time::Duration;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// How long a handler or worker waits for a free connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connect eagerly; startup fails fast when the database is unreachable.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    pool_options(max_connections).connect(database_url).await
}

/// Pool that opens connections on first use.
///
/// Only the URL is validated here.
pub fn create_lazy_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    pool_options(max_connections).connect_lazy(database_url)
}

/// Apply pending migrations from `migrations/`, embedded at compile time.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
