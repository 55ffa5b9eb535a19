//! Checkout arithmetic and coupon validation.

use bazaar_core::ShippingPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ClientError;
use crate::session::Session;

const VALIDATE_COUPON: &str = "/coupons/validate";

/// What the shopper pays, broken down for the order summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// `None` once shipping is free.
    pub remaining_for_free_shipping: Option<Decimal>,
}

impl CheckoutSummary {
    /// Shipping is decided on the subtotal before the coupon. The discount is
    /// capped at the subtotal, so the total never goes below the shipping fee.
    #[must_use]
    pub fn compute(cart_total: Decimal, policy: &ShippingPolicy, discount: Decimal) -> Self {
        let subtotal = cart_total.max(Decimal::ZERO);
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        let shipping = policy.quote(subtotal);
        Self {
            subtotal,
            shipping,
            discount,
            total: subtotal - discount + shipping,
            remaining_for_free_shipping: policy.remaining_for_free_shipping(subtotal),
        }
    }

    #[must_use]
    pub fn has_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateCouponBody<'a> {
    code: &'a str,
    cart_total: Decimal,
}

/// Result of `POST /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponValidation {
    /// The discount to apply: zero unless the coupon is valid.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        if self.valid {
            self.discount_amount
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone)]
pub struct CouponClient {
    session: Session,
}

impl CouponClient {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Ask the server whether `code` applies to a cart worth `cart_total`.
    ///
    /// A rejected coupon is an `Ok` with `valid == false` when the server
    /// answers with a validation payload.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank code, `MissingData` when the server sends
    /// nothing back, otherwise adapter errors.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        cart_total: Decimal,
    ) -> Result<CouponValidation, ClientError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ClientError::InvalidInput(
                "coupon code cannot be empty".to_string(),
            ));
        }

        let validation: CouponValidation = self
            .session
            .api()
            .post(VALIDATE_COUPON, &ValidateCouponBody { code, cart_total })
            .await?
            .ok_or(ClientError::MissingData(VALIDATE_COUPON))?;
        debug!(valid = validation.valid, "Coupon validated");
        Ok(validation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_summary_below_free_shipping() {
        let summary = CheckoutSummary::compute(dec("210"), &ShippingPolicy::default(), Decimal::ZERO);
        assert_eq!(summary.shipping, dec("29.90"));
        assert_eq!(summary.total, dec("239.90"));
        assert_eq!(summary.remaining_for_free_shipping, Some(dec("290")));
        assert!(!summary.has_free_shipping());
    }

    #[test]
    fn test_summary_free_shipping_uses_pre_discount_subtotal() {
        let summary = CheckoutSummary::compute(dec("520"), &ShippingPolicy::default(), dec("50"));
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.discount, dec("50"));
        assert_eq!(summary.total, dec("470"));
        assert_eq!(summary.remaining_for_free_shipping, None);
    }

    #[test]
    fn test_discount_is_capped_at_subtotal() {
        let summary = CheckoutSummary::compute(dec("40"), &ShippingPolicy::default(), dec("100"));
        assert_eq!(summary.discount, dec("40"));
        assert_eq!(summary.total, dec("29.90"));
    }

    #[test]
    fn test_invalid_coupon_discounts_nothing() {
        let validation: CouponValidation = serde_json::from_value(serde_json::json!({
            "valid": false,
            "discountAmount": 25,
            "message": "Coupon expired"
        }))
        .unwrap();
        assert_eq!(validation.discount(), Decimal::ZERO);
        assert_eq!(validation.message.as_deref(), Some("Coupon expired"));
    }
}
