//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! printbridge migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PRINTBRIDGE_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/sync/migrations/` and are embedded at build time.

use printbridge_sync::SyncConfig;
use printbridge_sync::db::MIGRATOR;

use super::{CliError, connect};

/// Apply pending migrations to the sync schema.
pub async fn run(config: &SyncConfig) -> Result<(), CliError> {
    let pool = connect(config).await?;

    tracing::info!("Running sync migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Sync migrations complete!");
    Ok(())
}
