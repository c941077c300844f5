mod common;
mod config;
mod routes;

mod audit_logs;
mod conditions;
mod growth_metrics;
mod locations;
mod researchers;
mod sample_researchers;
mod samples;

use crate::config::Config;
use anyhow::{Context, anyhow};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env().map_err(|e| anyhow!(e))?;
    let db_url = config
        .db_url
        .as_deref()
        .context("no database URL configured")?;

    let db: DatabaseConnection = Database::connect(db_url)
        .await
        .context("could not connect to the database")?;
    db.ping().await.context("database did not answer ping")?;
    tracing::info!("Connected to the database");

    Migrator::up(&db, None)
        .await
        .context("failed to run migrations")?;
    tracing::info!("DB migrations complete");

    tracing::info!(
        app = %config.app_name,
        deployment = %config.deployment.to_uppercase(),
        validation_mode = ?config.validation_mode,
        "Starting server"
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("could not bind {}", config.bind_address))?;
    tracing::info!("Listening on {}", config.bind_address);

    let router = routes::build_router(&db, &config);
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
