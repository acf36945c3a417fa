//! Product lookup used when adding to the cart.

use std::path::Path;

use thiserror::Error;

use harbor_core::ProductId;

use super::types::{AddOnItem, Product};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of products by id.
pub trait ProductCatalog: Send + Sync {
    fn product(&self, id: &ProductId) -> Option<Product>;
}

/// A fixed list of products and add-on offers.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCatalog {
    pub products: Vec<Product>,
    #[serde(default)]
    pub add_ons: Vec<AddOnItem>,
}

impl StaticCatalog {
    #[must_use]
    pub const fn new(products: Vec<Product>, add_ons: Vec<AddOnItem>) -> Self {
        Self { products, add_ons }
    }

    /// Parse a catalog from JSON: `{"products": [...], "addOns": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl ProductCatalog for StaticCatalog {
    fn product(&self, id: &ProductId) -> Option<Product> {
        self.products.iter().find(|p| &p.id == id).cloned()
    }
}
