//! Integration test harness for PrintBridge.
//!
//! Runs the real sync pipeline against in-memory stand-ins for Printify,
//! WooCommerce and `PostgreSQL`, so whole import and stock flows can be
//! driven from a test without any external service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p printbridge-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = TestContext::new();
//! ctx.supplier.add(fixtures::tee_shirt("P1"));
//!
//! assert!(ctx.pipeline.scheduler.start(false, true).await);
//! ctx.drain().await;
//!
//! assert_eq!(ctx.catalog.product_count(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod fixtures;
pub mod queue;
pub mod store;
pub mod supplier;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use printbridge_core::ShopId;
use printbridge_sync::config::ImportSettings;
use printbridge_sync::queue::run_once;
use printbridge_sync::{PipelineParts, SyncPipeline};

pub use catalog::{MemoryCatalog, StoredProduct, StoredVariation};
pub use queue::{MemoryQueue, QueuedStatus, QueuedTask};
pub use store::{MemoryMappings, MemoryStateStore};
pub use supplier::FakeSupplier;

/// Shop every fixture belongs to.
pub const TEST_SHOP: ShopId = ShopId::new(42);

/// Upper bound on worker rounds in [`TestContext::drain`].
const MAX_DRAIN_ROUNDS: usize = 1_000;

/// A pipeline wired to in-memory collaborators.
pub struct TestContext {
    pub supplier: Arc<FakeSupplier>,
    pub catalog: Arc<MemoryCatalog>,
    pub mappings: Arc<MemoryMappings>,
    pub state: Arc<MemoryStateStore>,
    pub queue: Arc<MemoryQueue>,
    pub pipeline: SyncPipeline,
}

impl TestContext {
    /// Context with a batch size of 10 and no completion grace delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(test_settings(10))
    }

    #[must_use]
    pub fn with_batch_size(batch_size: u32) -> Self {
        Self::with_settings(test_settings(batch_size))
    }

    #[must_use]
    pub fn with_settings(settings: ImportSettings) -> Self {
        let supplier = Arc::new(FakeSupplier::default());
        let catalog = Arc::new(MemoryCatalog::default());
        let mappings = Arc::new(MemoryMappings::default());
        let state = Arc::new(MemoryStateStore::default());
        let queue = Arc::new(MemoryQueue::default());

        let pipeline = SyncPipeline::new(PipelineParts {
            supplier: supplier.clone(),
            catalog: catalog.clone(),
            mapping_repo: mappings.clone(),
            state_store: state.clone(),
            queue: queue.clone(),
            settings,
        });

        Self {
            supplier,
            catalog,
            mappings,
            state,
            queue,
            pipeline,
        }
    }

    /// Run queued tasks until nothing is due. Returns how many ran.
    ///
    /// # Panics
    ///
    /// Panics if claiming fails or the queue never settles.
    pub async fn drain(&self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_DRAIN_ROUNDS {
            let ran = run_once(self.queue.as_ref(), &self.pipeline, 50)
                .await
                .unwrap_or_else(|e| panic!("claiming tasks failed: {e}"));
            if ran == 0 {
                return total;
            }
            total += ran;
        }
        panic!("task queue did not settle after {MAX_DRAIN_ROUNDS} rounds");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Import settings with no grace delay and no gallery stagger.
#[must_use]
pub const fn test_settings(batch_size: u32) -> ImportSettings {
    ImportSettings {
        shop_id: TEST_SHOP,
        batch_size,
        completion_delay: Duration::ZERO,
        max_completion_deferrals: 5,
        gallery_stagger: Duration::ZERO,
    }
}

/// Lock a fake's state, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
