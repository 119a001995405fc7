//! Persisted task queue (`sync.tasks`).
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so several workers can poll the same
//! table. A task whose claim is never acknowledged goes back to `pending`
//! after the visibility timeout, which is what makes delivery at-least-once.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, instrument};
use uuid::Uuid;

use super::RepositoryError;
use crate::queue::{ClaimedTask, Task, TaskQueue, TaskSource};

/// Claimed row as returned by the claim query.
#[derive(Debug, sqlx::FromRow)]
struct ClaimedRow {
    id: Uuid,
    payload: serde_json::Value,
    attempts: i32,
}

/// `PostgreSQL` implementation of [`TaskQueue`] and [`TaskSource`].
#[derive(Clone)]
pub struct PgTaskQueue {
    pool: PgPool,
}

impl PgTaskQueue {
    /// Create a new task queue.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    #[instrument(skip(self, task), fields(task = task.name(), run_at = %run_at))]
    async fn schedule(&self, run_at: DateTime<Utc>, task: &Task) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_value(task)?;

        sqlx::query(
            r"
            INSERT INTO sync.tasks (id, task_group, name, payload, run_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(task.group())
        .bind(task.name())
        .bind(payload)
        .bind(run_at)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn cancel_group(&self, group: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sync.tasks
            SET status = 'cancelled', finished_at = NOW()
            WHERE task_group = $1 AND status = 'pending'
            ",
        )
        .bind(group)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_pending(&self, group: &str) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sync.tasks WHERE task_group = $1 AND status = 'pending'",
        )
        .bind(group)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl TaskSource for PgTaskQueue {
    async fn claim_due(&self, limit: u32) -> Result<Vec<ClaimedTask>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClaimedRow>(
            r"
            UPDATE sync.tasks
            SET status = 'running', claimed_at = NOW(), attempts = attempts + 1
            WHERE id IN (
                SELECT id FROM sync.tasks
                WHERE status = 'pending' AND run_at <= NOW()
                ORDER BY run_at, created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, payload, attempts
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<Task>(row.payload) {
                Ok(task) => claimed.push(ClaimedTask {
                    id: row.id,
                    task,
                    attempts: row.attempts,
                }),
                Err(e) => {
                    // Unknown or malformed payloads would otherwise be requeued forever
                    error!(task_id = %row.id, error = %e, "Discarding undecodable task");
                    self.fail(row.id, &format!("undecodable payload: {e}")).await?;
                }
            }
        }

        Ok(claimed)
    }

    async fn complete(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE sync.tasks
            SET status = 'done', finished_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE sync.tasks
            SET status = 'failed', last_error = $2, finished_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn requeue_stale(&self, timeout: Duration) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sync.tasks
            SET status = 'pending', claimed_at = NULL
            WHERE status = 'running'
              AND claimed_at < NOW() - ($1 * INTERVAL '1 second')
            ",
        )
        .bind(timeout.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
