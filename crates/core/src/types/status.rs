//! Status enums for sync state and stock.

use serde::{Deserialize, Serialize};

/// Sync status of a supplier-to-local product mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Import scheduled or running for this product.
    #[default]
    Pending,
    /// Local entry matches the last supplier payload.
    Synced,
    /// The last import attempt failed.
    Error,
}

impl SyncStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Synced, Self::Pending, Self::Error];

    /// The storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid sync status: {s}")),
        }
    }
}

/// Stock status of a local catalog entry or variation.
///
/// Derived purely from quantity; see [`StockStatus::from_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[serde(rename = "instock")]
    InStock,
    #[serde(rename = "outofstock")]
    OutOfStock,
}

impl StockStatus {
    /// `quantity <= 0` is out of stock, anything else is in stock.
    #[must_use]
    pub const fn from_quantity(quantity: i64) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else {
            Self::InStock
        }
    }

    /// WooCommerce representation (`instock` / `outofstock`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
