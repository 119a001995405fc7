//! Polling task worker.
//!
//! Claims due tasks from a [`TaskSource`], hands each to a [`TaskHandler`] and
//! acknowledges the outcome. Claims that are never acknowledged (crashed
//! worker) are handed out again after the visibility timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::Task;
use crate::config::WorkerSettings;
use crate::db::RepositoryError;
use crate::error::SyncError;

/// How long `stop` waits for the loop to wind down.
const JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A task claimed for execution.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    pub id: Uuid,
    pub task: Task,
    /// Claims so far, including this one.
    pub attempts: i32,
}

/// Consuming side of the queue.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Claim up to `limit` due tasks, oldest `run_at` first.
    async fn claim_due(&self, limit: u32) -> Result<Vec<ClaimedTask>, RepositoryError>;

    /// Mark a claimed task finished.
    async fn complete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Mark a claimed task failed. Failed tasks are not retried.
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError>;

    /// Return claims older than `timeout` to the queue. Returns how many were requeued.
    async fn requeue_stale(&self, timeout: Duration) -> Result<u64, RepositoryError>;
}

/// Executes tasks.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: Task) -> Result<(), SyncError>;
}

/// Worker lifecycle errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker already running")]
    AlreadyRunning,

    #[error("worker not running")]
    NotRunning,

    #[error("worker task panicked")]
    Panicked,

    #[error("worker did not stop within {0:?}")]
    JoinTimeout(Duration),
}

/// Background worker with explicit start/stop.
pub struct TaskWorker {
    source: Arc<dyn TaskSource>,
    handler: Arc<dyn TaskHandler>,
    settings: WorkerSettings,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl TaskWorker {
    /// Create a new worker.
    #[must_use]
    pub fn new(
        source: Arc<dyn TaskSource>,
        handler: Arc<dyn TaskHandler>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            source,
            handler,
            settings,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Spawn the polling loop.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::AlreadyRunning` if the loop is already spawned.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            batch_size = self.settings.batch_size,
            "Starting task worker"
        );

        self.cancellation = CancellationToken::new();
        let source = Arc::clone(&self.source);
        let handler = Arc::clone(&self.handler);
        let settings = self.settings.clone();
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::process_loop(source, handler, settings, cancel).await;
        }));

        Ok(())
    }

    /// Cancel the loop and wait for the in-flight task to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not running, panicked, or does not
    /// stop in time.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        info!("Stopping task worker");
        self.cancellation.cancel();

        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                info!("Task worker stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Worker task panicked");
                Err(WorkerError::Panicked)
            }
            Err(_) => Err(WorkerError::JoinTimeout(JOIN_TIMEOUT)),
        }
    }

    /// Whether the polling loop is spawned.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn process_loop(
        source: Arc<dyn TaskSource>,
        handler: Arc<dyn TaskHandler>,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) {
        loop {
            match source.requeue_stale(settings.visibility_timeout).await {
                Ok(0) => {}
                Ok(n) => warn!(requeued = n, "Requeued stale task claims"),
                Err(e) => error!(error = %e, "Failed to requeue stale claims"),
            }

            // Drain while full batches keep coming, then wait for the next poll
            loop {
                if cancel.is_cancelled() {
                    debug!("Task worker loop cancelled");
                    return;
                }
                match run_once(source.as_ref(), handler.as_ref(), settings.batch_size).await {
                    Ok(n) if n >= settings.batch_size as usize => {}
                    Ok(_) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to claim tasks");
                        break;
                    }
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Task worker loop cancelled");
                    return;
                }
                () = tokio::time::sleep(settings.poll_interval) => {}
            }
        }
    }
}

/// Claim and execute one batch of due tasks. Returns how many were claimed.
///
/// # Errors
///
/// Returns an error only if claiming fails; handler failures are recorded on
/// the task.
pub async fn run_once(
    source: &dyn TaskSource,
    handler: &dyn TaskHandler,
    limit: u32,
) -> Result<usize, RepositoryError> {
    let claimed = source.claim_due(limit).await?;
    let count = claimed.len();

    for ClaimedTask { id, task, attempts } in claimed {
        let name = task.name();
        debug!(task_id = %id, task = name, attempts, "Running task");

        let ack = match handler.handle(task).await {
            Ok(()) => source.complete(id).await,
            Err(e) => {
                error!(task_id = %id, task = name, error = %e, "Task failed");
                source.fail(id, &e.to_string()).await
            }
        };
        if let Err(e) = ack {
            error!(task_id = %id, task = name, error = %e, "Failed to acknowledge task");
        }
    }

    Ok(count)
}
