//! Task worker command.
//!
//! Runs the queue worker against the production pipeline until Ctrl-C, then
//! stops it gracefully. Tasks claimed by a worker that died are requeued by
//! the next worker after the visibility timeout.

use std::sync::Arc;

use printbridge_sync::SyncConfig;
use printbridge_sync::queue::{TaskHandler, TaskSource, TaskWorker};

use super::{CliError, pipeline};

/// Run the worker until interrupted.
pub async fn run(config: &SyncConfig) -> Result<(), CliError> {
    let (pipeline, queue) = pipeline(config).await?;

    let mut worker = TaskWorker::new(
        queue as Arc<dyn TaskSource>,
        Arc::new(pipeline) as Arc<dyn TaskHandler>,
        config.worker.clone(),
    );
    worker.start()?;
    tracing::info!("Worker running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down worker...");
    worker.stop().await?;
    Ok(())
}
