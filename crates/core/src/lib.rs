//! PrintBridge Core - Shared types library.
//!
//! This crate provides common types used across all PrintBridge components:
//! - `sync` - Printify to WooCommerce sync engine (mapping, import, stock)
//! - `cli` - Command-line tools for migrations, imports and the task worker
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and sync statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

#[cfg(test)]
mod tests {
    use crate::{CurrencyCode, Price, StockStatus, SupplierProductId, SyncStatus};

    #[test]
    fn test_root_exports_price_types() {
        let price = Price::from_cents(1250, CurrencyCode::default());
        assert_eq!(price.currency_code, CurrencyCode::USD);
        assert_eq!(price.to_plain_string(), "12.50");
    }

    #[test]
    fn test_root_exports_status_and_ids() {
        assert_eq!(StockStatus::from_quantity(0), StockStatus::OutOfStock);
        assert_eq!(SyncStatus::default(), SyncStatus::Pending);
        assert!(SupplierProductId::new("abc").is_valid());
    }
}
