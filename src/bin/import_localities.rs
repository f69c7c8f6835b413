//! Loads a locality directory dump into Postgres.
//!
//! Usage: `import_localities <dump.json>` with `DATABASE_URL` set (a `.env` file works).

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use uasocial_bot::database::{init, localities_import};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    dotenv::dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .context("usage: import_localities <dump.json>")?;
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {path}"))?;
    let entries = localities_import::parse_dump(&raw)?;
    let total = entries.len();
    let rows = localities_import::flatten_communities(entries);
    tracing::info!(total, kept = rows.len(), "dump parsed");

    let pool = init::connect(&url, 2).await?;
    init::migrate(&pool).await?;
    let inserted = localities_import::import(&pool, &rows).await?;
    tracing::info!(inserted, "localities imported");
    Ok(())
}
