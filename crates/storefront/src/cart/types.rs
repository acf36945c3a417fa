//! Cart domain types.

use serde::{Deserialize, Serialize};

use harbor_core::{AddOnId, Price, ProductId};

/// A product as supplied by the catalog. Read-only to the cart.
///
/// `price <= original_price` is expected but not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub original_price: Price,
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Whether the product is sold below its original price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.price.amount < self.original_price.amount
    }
}

/// A line in the cart. Its id is the product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub product: Product,
    pub quantity: u32,
    pub is_selected: bool,
}

impl CartItem {
    pub(crate) fn new(product: Product) -> Self {
        Self {
            id: product.id.clone(),
            product,
            quantity: 1,
            is_selected: true,
        }
    }

    /// `price x quantity`, regardless of selection.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// An upsell offer shown alongside the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnItem {
    pub id: AddOnId,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub original_price: Price,
    pub discount_price: Price,
}

/// Price breakdown of the current cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum over selected items.
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub discount: Price,
    /// `subtotal + shipping_fee - discount`; may be negative.
    pub raw_total: Price,
    /// `raw_total` clamped at zero. This is the amount shown to the user.
    pub total: Price,
}
