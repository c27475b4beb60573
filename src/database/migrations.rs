//! Database Migrations
//!
//! Bootstraps the users table on startup.

use anyhow::{Context, Result};
use deadpool_postgres::Pool;

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    tracing::info!("Running database migrations...");

    let client = pool.get().await.context("Failed to get DB connection")?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .await
        .context("Failed to create users table")?;

    tracing::info!("Database migrations completed");
    Ok(())
}
