//! Wiring of the sync engine and task dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::catalog::{CatalogError, CatalogStore, CatalogWriter};
use crate::config::{ImportSettings, SyncConfig};
use crate::db::{PgImportStateStore, PgMappingRepository, PgTaskQueue};
use crate::error::SyncError;
use crate::import::{ImportEvents, ImportScheduler, ImportStateStore, ImportValidator};
use crate::mapping::{IdMappingStore, MappingRepository};
use crate::media::MediaImporter;
use crate::printify::{PrintifyClient, SupplierApi};
use crate::queue::{Task, TaskHandler, TaskQueue};
use crate::stock::StockReconciler;
use crate::woocommerce::WooCommerceClient;

/// Collaborators a pipeline is built from.
pub struct PipelineParts {
    pub supplier: Arc<dyn SupplierApi>,
    pub catalog: Arc<dyn CatalogStore>,
    pub mapping_repo: Arc<dyn MappingRepository>,
    pub state_store: Arc<dyn ImportStateStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub settings: ImportSettings,
}

/// The assembled sync engine. Routes queued tasks to their component.
#[derive(Clone)]
pub struct SyncPipeline {
    pub scheduler: ImportScheduler,
    pub mappings: IdMappingStore,
    pub stock: StockReconciler,
    pub media: MediaImporter,
}

impl SyncPipeline {
    /// Assemble every component over the given collaborators.
    #[must_use]
    pub fn new(parts: PipelineParts) -> Self {
        let PipelineParts {
            supplier,
            catalog,
            mapping_repo,
            state_store,
            queue,
            settings,
        } = parts;

        let mappings = IdMappingStore::new(mapping_repo, Arc::clone(&catalog));
        let writer = CatalogWriter::new(
            Arc::clone(&catalog),
            mappings.clone(),
            Arc::clone(&supplier),
            Arc::clone(&queue),
            settings.clone(),
        );
        let validator = ImportValidator::new(mappings.clone(), Arc::clone(&catalog));
        let stock = StockReconciler::new(
            Arc::clone(&supplier),
            Arc::clone(&catalog),
            mappings.clone(),
            settings.shop_id,
        );
        let media = MediaImporter::new(catalog);
        let scheduler = ImportScheduler::new(
            supplier,
            queue,
            state_store,
            mappings.clone(),
            writer,
            validator,
            settings,
            ImportEvents::new(),
        );

        Self {
            scheduler,
            mappings,
            stock,
            media,
        }
    }

    /// Build the production pipeline: Printify, WooCommerce and `PostgreSQL`.
    ///
    /// Also returns the task queue so the caller can run a worker on it.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn production(
        config: &SyncConfig,
        pool: PgPool,
    ) -> Result<(Self, Arc<PgTaskQueue>), SyncError> {
        let queue = Arc::new(PgTaskQueue::new(pool.clone()));
        let pipeline = Self::new(PipelineParts {
            supplier: Arc::new(PrintifyClient::new(&config.printify)?),
            catalog: Arc::new(
                WooCommerceClient::new(&config.woocommerce).map_err(CatalogError::from)?,
            ),
            mapping_repo: Arc::new(PgMappingRepository::new(pool.clone())),
            state_store: Arc::new(PgImportStateStore::new(pool)),
            queue: Arc::clone(&queue) as Arc<dyn TaskQueue>,
            settings: config.import.clone(),
        });
        Ok((pipeline, queue))
    }
}

#[async_trait]
impl TaskHandler for SyncPipeline {
    #[instrument(skip(self, task), fields(task = task.name()))]
    async fn handle(&self, task: Task) -> Result<(), SyncError> {
        match task {
            Task::ProcessBatch { page, processed } => {
                self.scheduler.process_batch(page, processed).await;
            }
            Task::ImportProduct { supplier_id } => {
                self.scheduler.import_single_product(&supplier_id).await;
            }
            Task::CompleteImport {
                processed,
                error,
                deferrals,
            } => {
                self.scheduler.complete(processed, error, deferrals).await;
            }
            Task::ImportFeaturedImage { product_id, src } => {
                self.media.import_featured(product_id, &src).await;
            }
            Task::ImportGalleryImage {
                product_id,
                src,
                position,
            } => {
                self.media.import_gallery(product_id, &src, position).await;
            }
            Task::ImportVariationImage {
                product_id,
                variation_id,
                src,
            } => {
                self.media
                    .import_variation(product_id, variation_id, &src)
                    .await;
            }
            Task::SyncStock => {
                self.stock.synchronize_all().await;
            }
        }
        Ok(())
    }
}
