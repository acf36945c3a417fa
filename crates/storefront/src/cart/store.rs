use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use harbor_core::{CurrencyCode, Price, ProductId};

use super::types::{AddOnItem, CartItem, CartTotals, Product};
use crate::config::CartConfig;
use crate::session::{KeyValueStorage, StorageError};

/// Storage key of the persisted cart.
pub const CART_STORAGE_KEY: &str = "harbor.cart";

/// Persisted form of the cart. Add-on offers and the shipping fee are
/// configuration, not state, so they are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub discount: Decimal,
}

/// Single source of truth for what is in the cart and what it costs.
///
/// Item ids are unique and every quantity is at least 1. Totals are
/// recomputed on every read.
#[derive(Debug, Clone)]
pub struct CartStore {
    items: Vec<CartItem>,
    add_ons: Vec<AddOnItem>,
    currency: CurrencyCode,
    shipping_fee: Decimal,
    discount: Decimal,
}

impl CartStore {
    /// An empty cart priced with `config`.
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        Self {
            items: Vec::new(),
            add_ons: Vec::new(),
            currency: config.currency,
            shipping_fee: config.shipping_fee,
            discount: Decimal::ZERO,
        }
    }

    /// Attach the add-on offers shown alongside the cart.
    #[must_use]
    pub fn with_add_ons(mut self, add_ons: Vec<AddOnItem>) -> Self {
        self.add_ons = add_ons;
        self
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn add_ons(&self) -> &[AddOnItem] {
        &self.add_ons
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether every line is selected. `false` for an empty cart.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.is_selected)
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    #[must_use]
    pub const fn shipping_fee(&self) -> Price {
        Price::new(self.shipping_fee, self.currency)
    }

    #[must_use]
    pub const fn discount(&self) -> Price {
        Price::new(self.discount, self.currency)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`, merging into an existing line.
    pub fn add_item(&mut self, product: Product) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == product.id) {
            item.quantity = item.quantity.saturating_add(1);
            tracing::debug!(product_id = %item.id, quantity = item.quantity, "Incremented cart item");
        } else {
            tracing::debug!(product_id = %product.id, "Added cart item");
            self.items.push(CartItem::new(product));
        }
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove_item(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        let removed = self.items.len() != before;
        if removed {
            tracing::debug!(product_id = %id, "Removed cart item");
        }
        removed
    }

    /// Set a line's quantity, clamped to `1..=u32::MAX`.
    ///
    /// Returns whether the line exists.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return false;
        };
        item.quantity = clamp_quantity(quantity);
        tracing::debug!(product_id = %id, quantity = item.quantity, "Updated cart quantity");
        true
    }

    /// Flip a line's selection. Returns whether the line exists.
    pub fn toggle_select(&mut self, id: &ProductId) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return false;
        };
        item.is_selected = !item.is_selected;
        true
    }

    /// Set every line's selection to `selected`.
    pub fn toggle_select_all(&mut self, selected: bool) {
        for item in &mut self.items {
            item.is_selected = selected;
        }
    }

    /// Remove every line and the discount. Add-on offers stay.
    pub fn clear(&mut self) {
        self.items.clear();
        self.discount = Decimal::ZERO;
        tracing::debug!("Cleared cart");
    }

    /// Apply an externally computed discount. Negative amounts count as zero.
    pub fn set_discount(&mut self, amount: Decimal) {
        self.discount = amount.max(Decimal::ZERO);
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Sum of `price x quantity` over selected lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .filter(|item| item.is_selected)
            .fold(Price::zero(self.currency), |acc, item| {
                acc.plus(item.line_total())
            })
    }

    /// Amount shown to the user: `subtotal + shipping - discount`, never
    /// below zero.
    #[must_use]
    pub fn total(&self) -> Price {
        self.totals().total
    }

    /// Full price breakdown.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let subtotal = self.subtotal();
        let raw_total = subtotal.plus(self.shipping_fee()).minus(self.discount());
        CartTotals {
            subtotal,
            shipping_fee: self.shipping_fee(),
            discount: self.discount(),
            raw_total,
            total: raw_total.clamp_non_negative(),
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            discount: self.discount,
        }
    }

    /// Replace the cart contents with `snapshot`.
    ///
    /// Snapshots come from storage, so invariants are re-established:
    /// duplicate lines are merged and quantities clamped to at least 1.
    pub fn restore(&mut self, snapshot: CartSnapshot) {
        self.items.clear();
        for mut incoming in snapshot.items {
            incoming.quantity = incoming.quantity.max(1);
            incoming.id = incoming.product.id.clone();
            match self.items.iter_mut().find(|item| item.id == incoming.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(incoming.quantity);
                }
                None => self.items.push(incoming),
            }
        }
        self.set_discount(snapshot.discount);
    }

    /// Load the persisted cart from `storage` into a new store.
    ///
    /// A missing or unreadable record yields an empty cart.
    #[must_use]
    pub fn load(config: &CartConfig, storage: &dyn KeyValueStorage) -> Self {
        let mut cart = Self::new(config);
        match storage.read(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<CartSnapshot>(&raw) {
                Ok(snapshot) => cart.restore(snapshot),
                Err(e) => tracing::warn!(error = %e, "Ignoring corrupt cart record"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read persisted cart"),
        }
        cart
    }

    /// Persist the cart to `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn save(&self, storage: &dyn KeyValueStorage) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.snapshot())?;
        storage.write(CART_STORAGE_KEY, &json)
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}
