//! Status and role enums shared by the storefront and the back office.

use serde::{Deserialize, Serialize};

/// Implements `Display` and `FromStr` over the snake_case wire names.
macro_rules! wire_names {
    ($ty:ident, $label:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// The name used on the wire and on the command line.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full back-office access.
    Admin,
    /// Regular shopper.
    #[default]
    Customer,
    /// Marketplace seller.
    Seller,
}

wire_names!(UserRole, "user role", {
    Admin => "admin",
    Customer => "customer",
    Seller => "seller",
});

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

wire_names!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Shoppers may cancel an order only before it is confirmed.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether no further transitions are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

wire_names!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

wire_names!(NotificationSeverity, "notification type", {
    Info => "info",
    Success => "success",
    Warning => "warning",
    Error => "error",
});

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage of the order subtotal.
    #[default]
    Percentage,
    /// `value` is an absolute amount.
    Fixed,
}

wire_names!(CouponKind, "coupon type", {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// Catalog visibility of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    OutOfStock,
}

wire_names!(ProductStatus, "product status", {
    Active => "active",
    Inactive => "inactive",
    OutOfStock => "out_of_stock",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::Admin, UserRole::Customer, UserRole::Seller] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!(
            "owner".parse::<UserRole>().unwrap_err(),
            "invalid user role: owner"
        );
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::OutOfStock).unwrap(),
            "\"out_of_stock\""
        );
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, OrderStatus::Shipped);
    }

    #[test]
    fn test_order_status_rules() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(!OrderStatus::Confirmed.is_cancellable());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }
}
