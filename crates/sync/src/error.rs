//! Top-level error type for the sync engine.

use printbridge_core::SupplierProductId;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::printify::PrintifyError;

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Supplier API call failed.
    #[error("supplier error: {0}")]
    Supplier(#[from] PrintifyError),

    /// Local catalog write or read failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Persistence failed.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Supplier payload cannot be imported.
    #[error("invalid supplier product: {0}")]
    InvalidProduct(String),

    /// The mapping row for a written product could not be recorded.
    #[error("failed to record mapping for supplier product {0}")]
    Mapping(SupplierProductId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Mapping(SupplierProductId::new("P1"));
        assert_eq!(
            err.to_string(),
            "failed to record mapping for supplier product P1"
        );

        let err: SyncError = CatalogError::Invalid("bad sku".to_string()).into();
        assert_eq!(
            err.to_string(),
            "catalog error: invalid catalog data: bad sku"
        );
    }
}
