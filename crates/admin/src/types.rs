//! Back-office wire types.
//!
//! Every admin payload is camelCase.

use bazaar_core::{
    BrandId, CategoryId, CouponId, CouponKind, ProductStatus, ShippingPolicy, UserId, UserRole,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Dashboard
// =============================================================================

/// Store-wide counters for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub pending_orders: u64,
    pub low_stock_products: u64,
    pub new_users_today: u64,
}

// =============================================================================
// Catalog management
// =============================================================================

/// Body of `POST /admin/products` and `PUT /admin/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sku: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    pub stock_quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<BrandId>,
    pub status: ProductStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ProductInput {
    /// Local checks the server would otherwise reject.
    ///
    /// # Errors
    ///
    /// A message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name cannot be empty".to_string());
        }
        if self.sku.trim().is_empty() {
            return Err("SKU cannot be empty".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if let Some(sale) = self.sale_price
            && (sale < Decimal::ZERO || sale >= self.price)
        {
            return Err("sale price must be below the list price".to_string());
        }
        Ok(())
    }
}

/// Body of the category endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CategoryInput {
    /// A top-level category with a slug derived from `name`.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            slug: slugify(name),
            description: None,
            parent_id: None,
            image_url: None,
        }
    }
}

/// Body of the brand endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl BrandInput {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            slug: slugify(name),
            description: None,
            logo_url: None,
        }
    }
}

/// Lower-case ASCII slug: runs of anything else collapse into one `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Whether the coupon can be redeemed at `now`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from.is_none_or(|from| from <= now)
            && self.valid_until.is_none_or(|until| now <= until)
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Discount this coupon grants on `subtotal`.
    ///
    /// Zero below the minimum order amount; percentage discounts respect the
    /// maximum; never more than the subtotal.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || self.min_order_amount.is_some_and(|min| subtotal < min) {
            return Decimal::ZERO;
        }
        let raw = match self.kind {
            CouponKind::Percentage => {
                let amount = (subtotal * self.value / Decimal::ONE_HUNDRED).round_dp(2);
                self.max_discount_amount.map_or(amount, |max| amount.min(max))
            }
            CouponKind::Fixed => self.value,
        };
        raw.max(Decimal::ZERO).min(subtotal)
    }
}

/// Body of `POST /admin/coupons` and `PUT /admin/coupons/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CouponInput {
    /// # Errors
    ///
    /// A message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("coupon code cannot be empty".to_string());
        }
        match self.kind {
            CouponKind::Percentage
                if self.value <= Decimal::ZERO || self.value > Decimal::ONE_HUNDRED =>
            {
                return Err("percentage must be between 0 and 100".to_string());
            }
            CouponKind::Fixed if self.value <= Decimal::ZERO => {
                return Err("discount amount must be positive".to_string());
            }
            _ => {}
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until)
            && until < from
        {
            return Err("coupon expires before it starts".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Users
// =============================================================================

/// A user as listed in the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedUser {
    pub id: UserId,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub total_spent: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// Filters for `GET /admin/users`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UserQuery {
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(role) = self.role {
            pairs.push(("role", role.to_string()));
        }
        if let Some(active) = self.is_active {
            pairs.push(("isActive", active.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// Which reviews the moderation queue shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewFilter {
    #[default]
    All,
    Pending,
    Approved,
    Reported,
}

impl ReviewFilter {
    #[must_use]
    pub const fn as_query(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Pending => Some("pending"),
            Self::Approved => Some("approved"),
            Self::Reported => Some("reported"),
        }
    }
}

impl std::str::FromStr for ReviewFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "reported" => Ok(Self::Reported),
            _ => Err(format!("invalid review filter: {s}")),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Store-wide settings.
///
/// Fields this client does not model (SMTP, SEO, social links) are carried
/// in `extra` so an update never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub free_shipping_threshold: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoreSettings {
    /// The shipping rule these settings describe.
    #[must_use]
    pub const fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_rate: self.shipping_cost,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn coupon(kind: CouponKind, value: &str) -> Coupon {
        Coupon {
            id: CouponId::new("c-1"),
            code: "SAVE".to_string(),
            kind,
            value: dec(value),
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            valid_from: None,
            valid_until: None,
            description: None,
            created_at: None,
        }
    }

    #[test]
    fn test_percentage_coupon_respects_cap() {
        let mut c = coupon(CouponKind::Percentage, "20");
        assert_eq!(c.discount_for(dec("250")), dec("50"));
        c.max_discount_amount = Some(dec("30"));
        assert_eq!(c.discount_for(dec("250")), dec("30"));
    }

    #[test]
    fn test_fixed_coupon_minimum_and_subtotal_cap() {
        let mut c = coupon(CouponKind::Fixed, "75");
        assert_eq!(c.discount_for(dec("50")), dec("50"));
        c.min_order_amount = Some(dec("100"));
        assert_eq!(c.discount_for(dec("99.99")), Decimal::ZERO);
        assert_eq!(c.discount_for(dec("100")), dec("75"));
    }

    #[test]
    fn test_coupon_usability_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut c = coupon(CouponKind::Fixed, "10");
        assert!(c.is_usable_at(now));

        c.valid_until = Some(Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap());
        assert!(!c.is_usable_at(now));

        c.valid_until = None;
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert!(!c.is_usable_at(now));
    }

    #[test]
    fn test_coupon_wire_format() {
        let c: Coupon = serde_json::from_value(serde_json::json!({
            "id": 7,
            "code": "WELCOME10",
            "type": "percentage",
            "value": 10,
            "usedCount": 4,
            "isActive": true,
            "validUntil": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(c.id.as_str(), "7");
        assert_eq!(c.kind, CouponKind::Percentage);
        assert_eq!(c.used_count, 4);
    }

    #[test]
    fn test_coupon_input_validation() {
        let mut input = CouponInput {
            code: "BIG".to_string(),
            kind: CouponKind::Percentage,
            value: dec("120"),
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            is_active: true,
            valid_from: None,
            valid_until: None,
            description: None,
        };
        assert!(input.validate().is_err());
        input.value = dec("15");
        assert!(input.validate().is_ok());
        input.code = "  ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Home & Kitchen "), "home-kitchen");
        assert_eq!(slugify("USB-C Cables!"), "usb-c-cables");
        assert_eq!(CategoryInput::named("Garden Tools").slug, "garden-tools");
    }

    #[test]
    fn test_product_input_rejects_sale_above_price() {
        let input = ProductInput {
            name: "Kettle".to_string(),
            description: None,
            sku: "KT-1".to_string(),
            price: dec("100"),
            sale_price: Some(dec("120")),
            stock_quantity: 5,
            category_id: None,
            brand_id: None,
            status: ProductStatus::Active,
            images: Vec::new(),
        };
        assert_eq!(
            input.validate().unwrap_err(),
            "sale price must be below the list price"
        );
    }

    #[test]
    fn test_user_query_pairs() {
        let query = UserQuery {
            search: Some(" ayse ".to_string()),
            role: Some(UserRole::Admin),
            is_active: Some(false),
            ..UserQuery::default()
        };
        assert_eq!(
            query.pairs(),
            vec![
                ("search", "ayse".to_string()),
                ("role", "admin".to_string()),
                ("isActive", "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_settings_keep_unknown_fields() {
        let settings: StoreSettings = serde_json::from_value(serde_json::json!({
            "siteName": "Bazaar",
            "freeShippingThreshold": 500,
            "shippingCost": 29.9,
            "smtpHost": "mail.example.com"
        }))
        .unwrap();
        assert_eq!(settings.shipping_policy(), ShippingPolicy::default());
        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["smtpHost"], "mail.example.com");
    }

    #[test]
    fn test_stats_tolerate_missing_fields() {
        let stats: AdminStats =
            serde_json::from_value(serde_json::json!({"totalUsers": 1250, "pendingOrders": 15}))
                .unwrap();
        assert_eq!(stats.total_users, 1250);
        assert_eq!(stats.pending_orders, 15);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
    }
}
