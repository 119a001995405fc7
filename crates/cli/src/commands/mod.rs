//! Command implementations.

pub mod import;
pub mod mapping;
pub mod migrate;
pub mod stock;
pub mod worker;

use std::sync::Arc;

use printbridge_sync::config::ConfigError;
use printbridge_sync::db::{PgTaskQueue, create_pool};
use printbridge_sync::queue::WorkerError;
use printbridge_sync::{SyncConfig, SyncError, SyncPipeline};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The sync engine reported an error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The task worker failed to start or stop cleanly.
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Waiting for the shutdown signal failed.
    #[error("Signal error: {0}")]
    Signal(#[from] std::io::Error),
}

async fn connect(config: &SyncConfig) -> Result<PgPool, CliError> {
    tracing::info!("Connecting to database...");
    Ok(create_pool(&config.database_url).await?)
}

/// Connect and assemble the production pipeline.
async fn pipeline(config: &SyncConfig) -> Result<(SyncPipeline, Arc<PgTaskQueue>), CliError> {
    let pool = connect(config).await?;
    Ok(SyncPipeline::production(config, pool)?)
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
