//! Batched catalog import.
//!
//! A run is `IDLE -> IN_PROGRESS -> IDLE`. `start` schedules batch 1; each
//! batch fetches one page, schedules one product task per item, then either
//! the next batch or a delayed completion. Nothing is carried between tasks
//! except their arguments and the persisted [`ImportState`].
//!
//! Task entry points never return errors: failures are logged and turned
//! into mapping status updates or a completion carrying the error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use super::events::{ImportEvent, ImportEvents};
use super::state::{ImportState, ImportStateStore, ImportSummary};
use super::validation::ImportValidator;
use crate::catalog::CatalogWriter;
use crate::config::ImportSettings;
use crate::error::SyncError;
use crate::mapping::{IdMappingStore, StatusCounts};
use crate::printify::SupplierApi;
use crate::queue::{IMPORT_GROUP, Task, TaskQueue};

/// Snapshot for status views.
#[derive(Debug, Clone, Serialize)]
pub struct ImportStats {
    pub in_progress: bool,
    pub last_started: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
    pub last_summary: Option<ImportSummary>,
    pub is_initial_import: bool,
    pub initial_import_complete: bool,
    pub catchup_sync: bool,
    pub status_counts: StatusCounts,
    /// Import tasks still waiting to run.
    pub pending_task_count: u64,
}

/// Orchestrates import runs over the task queue.
#[derive(Clone)]
pub struct ImportScheduler {
    supplier: Arc<dyn SupplierApi>,
    queue: Arc<dyn TaskQueue>,
    state: Arc<dyn ImportStateStore>,
    mappings: IdMappingStore,
    writer: CatalogWriter,
    validator: ImportValidator,
    settings: ImportSettings,
    events: ImportEvents,
}

impl ImportScheduler {
    /// Create a new import scheduler.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        supplier: Arc<dyn SupplierApi>,
        queue: Arc<dyn TaskQueue>,
        state: Arc<dyn ImportStateStore>,
        mappings: IdMappingStore,
        writer: CatalogWriter,
        validator: ImportValidator,
        settings: ImportSettings,
        events: ImportEvents,
    ) -> Self {
        Self {
            supplier,
            queue,
            state,
            mappings,
            writer,
            validator,
            settings,
            events,
        }
    }

    /// Start an import run.
    ///
    /// Returns `false` without scheduling anything if a run is already in
    /// progress and `force` is not set. A forced start first cancels the
    /// waiting tasks of the run it replaces.
    #[instrument(skip(self))]
    pub async fn start(&self, force: bool, is_initial: bool) -> bool {
        self.begin_run(force, is_initial, false).await
    }

    /// Start a non-forced, non-initial run flagged as a catch-up sync.
    #[instrument(skip(self))]
    pub async fn schedule_catchup(&self) -> bool {
        self.begin_run(false, false, true).await
    }

    async fn begin_run(&self, force: bool, is_initial: bool, catchup: bool) -> bool {
        let mut state = match self.state.load().await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to load import state");
                return false;
            }
        };

        if state.in_progress {
            if !force {
                info!("Import already in progress, not starting another");
                return false;
            }
            match self.queue.cancel_group(IMPORT_GROUP).await {
                Ok(n) => warn!(cancelled = n, "Forcing new import over the running one"),
                Err(e) => warn!(error = %e, "Failed to cancel tasks of the replaced import"),
            }
        }

        let now = Utc::now();
        state.begin(now, force, is_initial, catchup);
        if let Err(e) = self.state.save(&state).await {
            error!(error = %e, "Failed to save import state");
            return false;
        }

        let first_batch = Task::ProcessBatch {
            page: 1,
            processed: 0,
        };
        if let Err(e) = self.queue.schedule_now(&first_batch).await {
            error!(error = %e, "Failed to schedule first batch");
            state.abort();
            if let Err(e) = self.state.save(&state).await {
                error!(error = %e, "Failed to reset import state");
            }
            return false;
        }

        info!(
            shop_id = %self.settings.shop_id,
            batch_size = self.settings.batch_size,
            initial = is_initial,
            catchup,
            "Import started"
        );
        self.events.emit(ImportEvent::Started {
            started_at: now,
            initial: is_initial,
            catchup,
        });
        true
    }

    /// Fetch one page and fan it out into product tasks.
    ///
    /// Schedules the next page while pages come back full and more remain,
    /// otherwise one completion task after the grace delay. A failed fetch
    /// goes straight to completion with the error; the page is not retried.
    #[instrument(skip(self))]
    pub async fn process_batch(&self, page: u32, processed: u64) {
        match self.state.load().await {
            Ok(state) if state.in_progress => {}
            Ok(_) => {
                info!("No import in progress, dropping batch");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to load import state, dropping batch");
                return;
            }
        }

        let result = self
            .supplier
            .get_products(self.settings.shop_id, page, self.settings.batch_size)
            .await;
        let listing = match result {
            Ok(listing) => listing,
            Err(e) => {
                error!(error = %e, "Failed to fetch product page, completing import");
                self.schedule_completion(Utc::now(), processed, Some(e.to_string()))
                    .await;
                return;
            }
        };

        if listing.data.is_empty() {
            info!("Empty page, completing import");
            self.schedule_completion(Utc::now(), processed, None).await;
            return;
        }

        let mut total = processed;
        for item in &listing.data {
            if !item.id.is_valid() {
                warn!("Skipping listed product without an ID");
                continue;
            }
            let task = Task::ImportProduct {
                supplier_id: item.id.clone(),
            };
            match self.queue.schedule_now(&task).await {
                Ok(_) => total += 1,
                Err(e) => error!(
                    supplier_id = %item.id,
                    error = %e,
                    "Failed to schedule product import"
                ),
            }
        }

        let full_page = listing.data.len() >= self.settings.batch_size as usize;
        let more_pages = listing.last_page == 0 || listing.has_next_page();
        debug!(
            items = listing.data.len(),
            total,
            last_page = listing.last_page,
            "Batch fanned out"
        );

        if full_page && more_pages {
            let next = Task::ProcessBatch {
                page: page + 1,
                processed: total,
            };
            if let Err(e) = self.queue.schedule_now(&next).await {
                error!(error = %e, "Failed to schedule next batch, completing import");
                self.finish(total, Some(e.to_string())).await;
            }
        } else {
            self.schedule_completion(self.grace_deadline(), total, None)
                .await;
        }
    }

    fn grace_deadline(&self) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(self.settings.completion_delay)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Utc::now() + delay
    }

    /// Schedule the completion task, finishing inline if the queue refuses it.
    async fn schedule_completion(
        &self,
        run_at: DateTime<Utc>,
        processed: u64,
        error: Option<String>,
    ) {
        let task = Task::CompleteImport {
            processed,
            error: error.clone(),
            deferrals: 0,
        };
        if let Err(e) = self.queue.schedule(run_at, &task).await {
            error!(error = %e, "Failed to schedule completion, completing inline");
            self.finish(processed, error.or_else(|| Some(e.to_string())))
                .await;
        }
    }

    /// Import one supplier product. Failures end up as `error` mapping status.
    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    pub async fn import_single_product(&self, supplier_id: &SupplierProductId) {
        // Errors are already logged and recorded as mapping status
        let _ = self.sync_product(supplier_id).await;
    }

    /// Import one supplier product inline and report the outcome.
    ///
    /// # Errors
    ///
    /// Returns the supplier or catalog error that failed the import. The
    /// mapping is marked `error` before returning.
    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    pub async fn sync_product(
        &self,
        supplier_id: &SupplierProductId,
    ) -> Result<ProductId, SyncError> {
        let product = match self
            .supplier
            .get_product(self.settings.shop_id, supplier_id)
            .await
        {
            Ok(product) => product,
            Err(e) => {
                error!(error = %e, "Failed to fetch supplier product");
                self.mappings
                    .update_status(supplier_id, SyncStatus::Error)
                    .await;
                return Err(e.into());
            }
        };

        self.mappings
            .update_status(supplier_id, SyncStatus::Pending)
            .await;

        match self.writer.import_or_update(&product).await {
            Ok(local_id) => Ok(local_id),
            Err(e) => {
                error!(error = %e, "Product import failed");
                self.mappings
                    .update_status(supplier_id, SyncStatus::Error)
                    .await;
                Err(e)
            }
        }
    }

    /// Completion task.
    ///
    /// While product tasks are still waiting in the queue the completion is
    /// pushed back by the grace delay, at most `max_completion_deferrals`
    /// times. A completion arriving when no run is in progress is ignored.
    #[instrument(skip(self))]
    pub async fn complete(&self, processed: u64, error: Option<String>, deferrals: u32) {
        match self.state.load().await {
            Ok(state) if state.in_progress => {}
            Ok(_) => {
                info!("No import in progress, ignoring completion");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to load import state");
                return;
            }
        }

        if deferrals < self.settings.max_completion_deferrals {
            match self.queue.count_pending(IMPORT_GROUP).await {
                Ok(0) => {}
                Ok(waiting) => {
                    let task = Task::CompleteImport {
                        processed,
                        error: error.clone(),
                        deferrals: deferrals + 1,
                    };
                    match self.queue.schedule(self.grace_deadline(), &task).await {
                        Ok(_) => {
                            info!(
                                waiting,
                                deferrals = deferrals + 1,
                                "Product imports still queued, deferring completion"
                            );
                            return;
                        }
                        Err(e) => warn!(error = %e, "Failed to defer completion, completing now"),
                    }
                }
                Err(e) => warn!(error = %e, "Failed to count queued imports, completing now"),
            }
        }

        self.finish(processed, error).await;
    }

    /// Leave `IN_PROGRESS`, validate, and announce the summary.
    async fn finish(&self, processed: u64, error: Option<String>) {
        let mut state = match self.state.load().await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to load import state");
                return;
            }
        };

        let Some(summary) = state.finish(Utc::now(), processed, error) else {
            return;
        };
        if let Err(e) = self.state.save(&state).await {
            error!(error = %e, "Failed to save import state");
        }

        self.validator.run().await;

        match &summary.error {
            Some(err) => warn!(processed, error = %err, "Import completed with error"),
            None => info!(processed, outcome = "success", "Import completed"),
        }
        self.events.emit(ImportEvent::Completed(summary));
    }

    /// Cancel the running import: drop its waiting tasks and leave `IN_PROGRESS`.
    ///
    /// Already imported products stay. Returns how many tasks were cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> u64 {
        let cancelled = match self.queue.cancel_group(IMPORT_GROUP).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "Failed to cancel import tasks");
                0
            }
        };

        match self.state.load().await {
            Ok(mut state) => {
                state.abort();
                if let Err(e) = self.state.save(&state).await {
                    error!(error = %e, "Failed to save import state");
                }
            }
            Err(e) => error!(error = %e, "Failed to load import state"),
        }

        info!(cancelled, "Import cancelled");
        self.events.emit(ImportEvent::Cancelled {
            cancelled_tasks: cancelled,
        });
        cancelled
    }

    /// Current run state, mapping counts and queue depth.
    pub async fn stats(&self) -> ImportStats {
        let state = self.state.load().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to load import state");
            ImportState::default()
        });
        let pending_task_count = self
            .queue
            .count_pending(IMPORT_GROUP)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to count queued tasks");
                0
            });

        ImportStats {
            in_progress: state.in_progress,
            last_started: state.last_started,
            last_completed: state.last_completed,
            last_summary: state.last_stats,
            is_initial_import: state.is_initial_import,
            initial_import_complete: state.initial_import_complete,
            catchup_sync: state.catchup_sync,
            status_counts: self.mappings.status_counts().await,
            pending_task_count,
        }
    }

    /// Receive import lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.events.subscribe()
    }
}
