//! Price arithmetic using decimal amounts.
//!
//! Everything here is pure: sale-price resolution, discount badges and the
//! free-shipping rule the cart and checkout screens share.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., lira, not kuruş).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display with two decimals, e.g. `₺1249.90`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{}{rounded:.2}", self.currency_code.symbol())
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    TRY,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::TRY => "₺",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

/// The unit price a shopper actually pays: the sale price when one is set,
/// otherwise the list price.
#[must_use]
pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    sale_price.unwrap_or(price)
}

/// Whole-percent discount for a sale badge.
///
/// Rounds `(price - sale) / price * 100` half away from zero. Returns 0 when
/// there is no sale price, the list price is not positive, or the "sale"
/// is not actually cheaper.
#[must_use]
pub fn discount_percentage(price: Decimal, sale_price: Option<Decimal>) -> u32 {
    let Some(sale) = sale_price else {
        return 0;
    };
    if price <= Decimal::ZERO || sale >= price {
        return 0;
    }

    let percent = ((price - sale) / price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    percent.to_u32().unwrap_or(0)
}

/// Shipping charge rule: free at or above a threshold, otherwise a flat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Order subtotal at which shipping becomes free.
    pub free_shipping_threshold: Decimal,
    /// Charge applied below the threshold.
    pub flat_rate: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::new(500, 0),
            flat_rate: Decimal::new(2990, 2),
        }
    }
}

impl ShippingPolicy {
    /// Shipping charge for a subtotal. An empty cart ships for free.
    #[must_use]
    pub fn quote(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_rate
        }
    }

    /// How much more the shopper must add to qualify for free shipping.
    ///
    /// `None` once the threshold is reached.
    #[must_use]
    pub fn remaining_for_free_shipping(&self, subtotal: Decimal) -> Option<Decimal> {
        (subtotal < self.free_shipping_threshold)
            .then(|| self.free_shipping_threshold - subtotal.max(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_effective_price_prefers_sale() {
        assert_eq!(effective_price(dec("100"), Some(dec("80"))), dec("80"));
        assert_eq!(effective_price(dec("100"), None), dec("100"));
        // A zero sale price is still a sale price.
        assert_eq!(effective_price(dec("100"), Some(Decimal::ZERO)), Decimal::ZERO);
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(discount_percentage(dec("100"), Some(dec("80"))), 20);
        assert_eq!(discount_percentage(dec("299.90"), Some(dec("199.90"))), 33);
        assert_eq!(discount_percentage(dec("3"), Some(dec("2.5"))), 17);
        assert_eq!(discount_percentage(dec("100"), None), 0);
        assert_eq!(discount_percentage(dec("100"), Some(dec("120"))), 0);
        assert_eq!(discount_percentage(Decimal::ZERO, Some(dec("1"))), 0);
    }

    #[test]
    fn test_shipping_quote() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.quote(dec("499.99")), dec("29.90"));
        assert_eq!(policy.quote(dec("500")), Decimal::ZERO);
        assert_eq!(policy.quote(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_remaining_for_free_shipping() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.remaining_for_free_shipping(dec("350")), Some(dec("150")));
        assert_eq!(policy.remaining_for_free_shipping(dec("500")), None);
        assert_eq!(policy.remaining_for_free_shipping(dec("750")), None);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(dec("1249.9"), CurrencyCode::TRY);
        assert_eq!(price.to_string(), "₺1249.90");
        assert_eq!(Price::new(dec("5"), CurrencyCode::USD).display(), "$5.00");
    }
}
