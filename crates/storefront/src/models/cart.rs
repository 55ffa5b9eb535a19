//! Cart lines and wishlist entries.

use bazaar_core::{CartLineId, ProductId, WishlistEntryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductSnapshot;

/// One product in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartLine {
    /// `effective unit price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.effective_price() * Decimal::from(self.quantity)
    }
}

/// Σ line totals.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Σ quantities, saturating at `u32::MAX`.
#[must_use]
pub fn cart_item_count(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0_u32, |count, line| count.saturating_add(line.quantity))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: WishlistEntryId,
    pub product_id: ProductId,
    pub product: ProductSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `POST /cart/items` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddCartItem<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// `PUT /cart/items/{id}` body.
#[derive(Debug, Serialize)]
pub(crate) struct QuantityBody {
    pub quantity: u32,
}

/// `POST /wishlist/items` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductRef<'a> {
    pub product_id: &'a ProductId,
}
