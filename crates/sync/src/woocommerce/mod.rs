//! WooCommerce REST API integration.
//!
//! [`WooCommerceClient`] implements [`crate::catalog::CatalogStore`] over
//! `wp-json/wc/v3`, authenticated with a REST consumer key and secret.

pub mod client;
pub mod types;

pub use client::WooCommerceClient;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that can occur when interacting with the WooCommerce API.
#[derive(Debug, Error)]
pub enum WooCommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WooCommerce returned a non-success status.
    #[error("WooCommerce API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<WooCommerceError> for CatalogError {
    fn from(err: WooCommerceError) -> Self {
        match err {
            WooCommerceError::NotFound(what) => Self::NotFound(what),
            WooCommerceError::Api {
                status: 400,
                message,
            } => Self::Invalid(message),
            other => Self::Backend(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_maps_to_invalid() {
        let err: CatalogError = WooCommerceError::Api {
            status: 400,
            message: "Invalid SKU".to_string(),
        }
        .into();
        assert!(matches!(err, CatalogError::Invalid(m) if m == "Invalid SKU"));
    }

    #[test]
    fn test_server_error_maps_to_backend() {
        let err: CatalogError = WooCommerceError::Api {
            status: 502,
            message: "Bad Gateway".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "catalog backend error: WooCommerce API error (502): Bad Gateway"
        );
    }
}
