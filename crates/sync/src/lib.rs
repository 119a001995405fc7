//! Printify to WooCommerce sync engine.
//!
//! Imports the Printify catalog into a WooCommerce store and keeps it in
//! step afterwards:
//!
//! - [`mapping::IdMappingStore`] links supplier product IDs to local product IDs
//! - [`catalog::CatalogWriter`] creates or updates one local product per supplier product
//! - [`import::ImportScheduler`] pages through the catalog as queued batches
//! - [`stock::StockReconciler`] pushes supplier availability onto local stock
//!
//! Long-running work goes through the durable task queue in [`queue`], which
//! a [`queue::TaskWorker`] drains against a [`pipeline::SyncPipeline`].
//!
//! # Security
//!
//! This crate holds write credentials for the WooCommerce store and the
//! Printify shop. Keep them out of logs; config types redact them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod mapping;
pub mod media;
pub mod pipeline;
pub mod printify;
pub mod queue;
pub mod stock;
pub mod woocommerce;

pub use config::SyncConfig;
pub use error::SyncError;
pub use pipeline::{PipelineParts, SyncPipeline};
