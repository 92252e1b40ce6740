//! Database Layer
//!
//! `PostgreSQL` connection pool and migrations.

use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(config.database_max_connections)
        // Fail fast on pool exhaustion; callers see `StoreError::Unavailable`
        .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    info!(
        max_connections = config.database_max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
