//! `Atrium` Server - Main Entry Point
//!
//! Prepares the permission store: connects to `PostgreSQL`, applies
//! pending migrations and reports the access catalog.

use anyhow::Result;
use tracing::info;

use atrium_server::permissions::{list_modules, queries, PgStore};
use atrium_server::{config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium_server=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Atrium permission store"
    );

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    for descriptor in list_modules() {
        info!(
            module = %descriptor.module,
            access = %descriptor.access_levels,
            "Catalog module"
        );
    }

    let roles = queries::list_roles(store.pool()).await?;
    info!(
        roles = roles.len(),
        bulk_assign_concurrency = config.bulk_assign_concurrency,
        "Permission store ready"
    );

    Ok(())
}
