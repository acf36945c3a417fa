//! Shopping cart: line items, selection, quantities and pricing.
//!
//! [`CartStore`] is a plain owned value; the application root decides where
//! it lives and when it is persisted (see [`CartStore::load`] and
//! [`CartStore::save`]).

mod catalog;
mod store;
mod types;

pub use catalog::{CatalogError, ProductCatalog, StaticCatalog};
pub use store::{CART_STORAGE_KEY, CartSnapshot, CartStore};
pub use types::{AddOnItem, CartItem, CartTotals, Product};
