//! Connection pool creation and schema migrations.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

/// A type alias for the database connection pool (`Pool<Postgres>`).
pub type DbPool = Pool<Postgres>;

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("connect to postgres")?;
    tracing::info!(target: "storage", max_connections, "database pool ready");
    Ok(pool)
}

/// Applies the embedded migrations under `migrations/`.
pub async fn migrate(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("run database migrations")?;
    tracing::info!(target: "storage", "migrations applied");
    Ok(())
}
