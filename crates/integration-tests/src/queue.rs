//! In-memory task queue.
//!
//! Honours `run_at` like the `PostgreSQL` queue: only due tasks are claimed,
//! oldest first, ties broken by scheduling order.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printbridge_sync::db::RepositoryError;
use printbridge_sync::queue::{ClaimedTask, Task, TaskQueue, TaskSource};
use uuid::Uuid;

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuedStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub id: Uuid,
    pub run_at: DateTime<Utc>,
    pub task: Task,
    pub status: QueuedStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
}

/// Every task ever scheduled, in scheduling order.
#[derive(Default)]
pub struct MemoryQueue {
    tasks: Mutex<Vec<QueuedTask>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn all(&self) -> Vec<QueuedTask> {
        lock(&self.tasks).clone()
    }

    /// Tasks named `name` (see [`Task::name`]) in any status.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<QueuedTask> {
        lock(&self.tasks)
            .iter()
            .filter(|t| t.task.name() == name)
            .cloned()
            .collect()
    }

    /// Tasks still waiting to run.
    #[must_use]
    pub fn pending(&self) -> Vec<Task> {
        lock(&self.tasks)
            .iter()
            .filter(|t| t.status == QueuedStatus::Pending)
            .map(|t| t.task.clone())
            .collect()
    }

    #[must_use]
    pub fn count(&self, name: &str, status: QueuedStatus) -> usize {
        lock(&self.tasks)
            .iter()
            .filter(|t| t.task.name() == name && t.status == status)
            .count()
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn schedule(&self, run_at: DateTime<Utc>, task: &Task) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        lock(&self.tasks).push(QueuedTask {
            id,
            run_at,
            task: task.clone(),
            status: QueuedStatus::Pending,
            attempts: 0,
            last_error: None,
        });
        Ok(id)
    }

    async fn cancel_group(&self, group: &str) -> Result<u64, RepositoryError> {
        let mut cancelled = 0;
        for queued in lock(&self.tasks).iter_mut() {
            if queued.status == QueuedStatus::Pending && queued.task.group() == group {
                queued.status = QueuedStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn count_pending(&self, group: &str) -> Result<u64, RepositoryError> {
        let count = lock(&self.tasks)
            .iter()
            .filter(|t| t.status == QueuedStatus::Pending && t.task.group() == group)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl TaskSource for MemoryQueue {
    async fn claim_due(&self, limit: u32) -> Result<Vec<ClaimedTask>, RepositoryError> {
        let now = Utc::now();
        let mut tasks = lock(&self.tasks);

        let mut due: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == QueuedStatus::Pending && t.run_at <= now)
            .map(|(i, _)| i)
            .collect();
        // Stable sort keeps scheduling order among equal run_at
        due.sort_by_key(|&i| tasks.get(i).map(|t| t.run_at));
        due.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for i in due {
            if let Some(queued) = tasks.get_mut(i) {
                queued.status = QueuedStatus::Running;
                queued.attempts += 1;
                claimed.push(ClaimedTask {
                    id: queued.id,
                    task: queued.task.clone(),
                    attempts: queued.attempts,
                });
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.finish(id, QueuedStatus::Done, None)
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError> {
        self.finish(id, QueuedStatus::Failed, Some(error.to_string()))
    }

    async fn requeue_stale(&self, _timeout: Duration) -> Result<u64, RepositoryError> {
        Ok(0)
    }
}

impl MemoryQueue {
    fn finish(
        &self,
        id: Uuid,
        status: QueuedStatus,
        error: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut tasks = lock(&self.tasks);
        let queued = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(RepositoryError::NotFound)?;
        queued.status = status;
        queued.last_error = error;
        Ok(())
    }
}
