//! Import orchestration: run state, the batched scheduler, post-import
//! validation and lifecycle events.

pub mod events;
pub mod scheduler;
pub mod state;
pub mod validation;

pub use events::{ImportEvent, ImportEvents};
pub use scheduler::{ImportScheduler, ImportStats};
pub use state::{ImportState, ImportStateStore, ImportSummary};
pub use validation::ImportValidator;
