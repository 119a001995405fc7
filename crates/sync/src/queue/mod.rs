//! Task queue: the persisted job graph that drives imports.
//!
//! Every multi-step operation is split into [`Task`]s connected only by their
//! arguments. A batch task fans out into product tasks and either the next
//! batch or one completion task; image and stock work ride the same queue in
//! their own groups.
//!
//! Delivery is at-least-once. Handlers must tolerate running a task twice.

pub mod worker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printbridge_core::{ProductId, SupplierProductId, VariationId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::RepositoryError;

pub use worker::{ClaimedTask, TaskHandler, TaskSource, TaskWorker, WorkerError, run_once};

/// Batch, product and completion tasks of an import run.
pub const IMPORT_GROUP: &str = "printify-import";
/// Image attachment tasks.
pub const MEDIA_GROUP: &str = "printify-media";
/// Stock reconciliation tasks.
pub const STOCK_GROUP: &str = "printify-stock";

/// A schedulable unit of work with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", content = "args", rename_all = "snake_case")]
pub enum Task {
    /// Fetch one page of supplier products and fan it out.
    ProcessBatch { page: u32, processed: u64 },
    /// Import or update one supplier product.
    ImportProduct { supplier_id: SupplierProductId },
    /// Finish the import run.
    CompleteImport {
        processed: u64,
        #[serde(default)]
        error: Option<String>,
        /// Times this completion was pushed back waiting for product tasks.
        #[serde(default)]
        deferrals: u32,
    },
    ImportFeaturedImage { product_id: ProductId, src: String },
    ImportGalleryImage {
        product_id: ProductId,
        src: String,
        position: u32,
    },
    ImportVariationImage {
        product_id: ProductId,
        variation_id: VariationId,
        src: String,
    },
    /// Reconcile stock for every synced mapping.
    SyncStock,
}

impl Task {
    /// Stable task name (matches the serialized tag).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProcessBatch { .. } => "process_batch",
            Self::ImportProduct { .. } => "import_product",
            Self::CompleteImport { .. } => "complete_import",
            Self::ImportFeaturedImage { .. } => "import_featured_image",
            Self::ImportGalleryImage { .. } => "import_gallery_image",
            Self::ImportVariationImage { .. } => "import_variation_image",
            Self::SyncStock => "sync_stock",
        }
    }

    /// Group the task is scheduled in.
    #[must_use]
    pub const fn group(&self) -> &'static str {
        match self {
            Self::ProcessBatch { .. }
            | Self::ImportProduct { .. }
            | Self::CompleteImport { .. } => IMPORT_GROUP,
            Self::ImportFeaturedImage { .. }
            | Self::ImportGalleryImage { .. }
            | Self::ImportVariationImage { .. } => MEDIA_GROUP,
            Self::SyncStock => STOCK_GROUP,
        }
    }
}

/// Scheduling side of the queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Schedule `task` to run at or after `run_at` in its group.
    async fn schedule(&self, run_at: DateTime<Utc>, task: &Task) -> Result<Uuid, RepositoryError>;

    /// Unschedule every not-yet-started task in `group`. Returns how many were cancelled.
    async fn cancel_group(&self, group: &str) -> Result<u64, RepositoryError>;

    /// Tasks in `group` still waiting to run.
    async fn count_pending(&self, group: &str) -> Result<u64, RepositoryError>;

    /// Schedule `task` to run as soon as possible.
    async fn schedule_now(&self, task: &Task) -> Result<Uuid, RepositoryError> {
        self.schedule(Utc::now(), task).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_serializes_with_name_tag() {
        let task = Task::ProcessBatch {
            page: 2,
            processed: 10,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({"task": "process_batch", "args": {"page": 2, "processed": 10}})
        );
        assert_eq!(value["task"], task.name());
    }

    #[test]
    fn test_unit_task_round_trips() {
        let value = serde_json::to_value(Task::SyncStock).unwrap();
        assert_eq!(value["task"], "sync_stock");
        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, Task::SyncStock);
    }

    #[test]
    fn test_completion_defaults_optional_args() {
        let task: Task = serde_json::from_value(json!({
            "task": "complete_import",
            "args": {"processed": 7}
        }))
        .unwrap();
        assert_eq!(
            task,
            Task::CompleteImport {
                processed: 7,
                error: None,
                deferrals: 0
            }
        );
    }

    #[test]
    fn test_groups() {
        assert_eq!(
            Task::ImportProduct {
                supplier_id: SupplierProductId::new("P1")
            }
            .group(),
            IMPORT_GROUP
        );
        assert_eq!(
            Task::ImportVariationImage {
                product_id: ProductId::new(1),
                variation_id: VariationId::new(2),
                src: "https://img".to_string()
            }
            .group(),
            MEDIA_GROUP
        );
        assert_eq!(Task::SyncStock.group(), STOCK_GROUP);
    }
}
