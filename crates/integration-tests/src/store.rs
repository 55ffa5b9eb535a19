//! In-memory data behind the mock API.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use bazaar_admin::Coupon;
use bazaar_core::{
    BrandId, CartLineId, CategoryId, CouponId, CouponKind, NotificationId, NotificationSeverity,
    ProductId, ReviewId, ShippingPolicy, UserId, WishlistEntryId,
};
use bazaar_storefront::models::{
    Address, Brand, CartLine, Category, Notification, Product, Review, WishlistEntry,
};
use chrono::{Duration as Age, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

/// A seeded account.
#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: &'static str,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub phone: Option<String>,
}

impl MockUser {
    pub(crate) fn identity(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "fullName": self.full_name,
            "role": self.role,
            "isEmailVerified": self.is_email_verified,
            "isActive": self.is_active,
            "phone": self.phone,
        })
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// A scripted failure for one `method path` pair.
#[derive(Debug, Clone)]
pub(crate) struct Fault {
    pub status: StatusCode,
    pub remaining: usize,
}

pub(crate) type RouteKey = (Method, String);

/// What a mailed one-time token unlocks, and for which user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EmailToken {
    Verify(String),
    Reset(String),
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    pub users: Vec<MockUser>,
    pub tokens: HashMap<String, String>,
    pub products: Vec<Product>,
    pub carts: HashMap<String, Vec<CartLine>>,
    pub wishlists: HashMap<String, Vec<WishlistEntry>>,
    pub notifications: HashMap<String, Vec<Notification>>,
    pub orders: HashMap<String, Vec<Value>>,
    pub addresses: HashMap<String, Vec<Address>>,
    pub reviews: Vec<Review>,
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub coupons: Vec<Coupon>,
    pub settings: Value,
    pub email_tokens: HashMap<String, EmailToken>,
    /// `(recipient, token)` for every email sent, oldest first.
    pub outbox: Vec<(String, String)>,
    /// Answer `PUT /user/profile` without echoing the updated user.
    pub quiet_profile_updates: bool,
    pub faults: HashMap<RouteKey, Fault>,
    pub delays: HashMap<RouteKey, Duration>,
    pub hits: HashMap<RouteKey, usize>,
    next_id: u64,
}

impl Store {
    pub(crate) fn seeded() -> Self {
        let mut store = Self {
            users: vec![
                MockUser {
                    id: "u-1".to_string(),
                    email: crate::SHOPPER_EMAIL.to_string(),
                    password: crate::SHOPPER_PASSWORD.to_string(),
                    full_name: "Ayşe Yılmaz".to_string(),
                    role: "customer",
                    is_active: true,
                    is_email_verified: true,
                    phone: None,
                },
                MockUser {
                    id: "u-2".to_string(),
                    email: crate::OTHER_SHOPPER_EMAIL.to_string(),
                    password: crate::OTHER_SHOPPER_PASSWORD.to_string(),
                    full_name: "Mehmet Demir".to_string(),
                    role: "customer",
                    is_active: true,
                    is_email_verified: true,
                    phone: None,
                },
                MockUser {
                    id: "u-admin".to_string(),
                    email: crate::ADMIN_EMAIL.to_string(),
                    password: crate::ADMIN_PASSWORD.to_string(),
                    full_name: "Store Admin".to_string(),
                    role: "admin",
                    is_active: true,
                    is_email_verified: true,
                    phone: None,
                },
            ],
            products: vec![
                product("p-1", "Çay Bardağı", Decimal::new(50, 0), None, 40),
                product("p-2", "Türk Kahvesi", Decimal::new(80, 0), Some(Decimal::new(55, 0)), 12),
                product("p-3", "Bakır Cezve", Decimal::new(120, 0), None, 3),
            ],
            reviews: vec![
                review("r-1", "p-1", "u-2", "Mehmet Demir", 5),
                review("r-2", "p-1", "u-admin", "Store Admin", 4),
            ],
            categories: vec![Category {
                id: CategoryId::new("c-1"),
                name: "Kitchen".to_string(),
                slug: "kitchen".to_string(),
                description: None,
                image_url: None,
                parent_id: None,
                children: Vec::new(),
                product_count: 3,
                is_active: true,
                created_at: None,
            }],
            brands: vec![Brand {
                id: BrandId::new("b-1"),
                name: "Bazaar".to_string(),
                slug: "bazaar".to_string(),
                description: None,
                logo_url: None,
                product_count: 3,
                is_active: true,
                created_at: None,
            }],
            coupons: vec![Coupon {
                id: CouponId::new("cp-1"),
                code: crate::WELCOME_COUPON.to_string(),
                kind: CouponKind::Percentage,
                value: Decimal::new(10, 0),
                min_order_amount: Some(Decimal::new(100, 0)),
                max_discount_amount: None,
                usage_limit: None,
                used_count: 0,
                is_active: true,
                valid_from: None,
                valid_until: None,
                description: Some("Ten percent off a first order".to_string()),
                created_at: None,
            }],
            settings: seeded_settings(),
            next_id: 100,
            ..Self::default()
        };

        let feed = (1..=5)
            .map(|n| Notification {
                id: NotificationId::new(format!("n-{n}")),
                title: format!("Notice {n}"),
                message: format!("Message {n}"),
                severity: NotificationSeverity::Info,
                is_read: n > 3,
                created_at: Utc::now() - Age::minutes(i64::from(n)),
                action_url: None,
            })
            .collect();
        store.notifications.insert("u-1".to_string(), feed);
        store
    }

    pub(crate) fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub(crate) fn user_by_token(&self, token: &str) -> Option<&MockUser> {
        let id = self.tokens.get(token)?;
        self.users.iter().find(|user| &user.id == id)
    }

    pub(crate) fn user_mut(&mut self, id: &str) -> Option<&mut MockUser> {
        self.users.iter_mut().find(|user| user.id == id)
    }

    pub(crate) fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == id)
    }

    /// Issue a one-time token and "send" it to `recipient`.
    pub(crate) fn mail(&mut self, recipient: &str, token: EmailToken) -> String {
        let value = self.next_id("mail");
        self.email_tokens.insert(value.clone(), token);
        self.outbox.push((recipient.to_string(), value.clone()));
        value
    }

    /// Any user's order, for the back office.
    pub(crate) fn order_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.orders
            .values_mut()
            .flatten()
            .find(|order| order.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Recompute a product's rating and review count from its approved reviews.
    pub(crate) fn restat(&mut self, id: &ProductId) {
        let approved: Vec<u8> = self
            .reviews
            .iter()
            .filter(|review| review.is_approved && review.product_id.as_ref() == Some(id))
            .map(|review| review.rating)
            .collect();
        let Some(product) = self.products.iter_mut().find(|product| &product.id == id) else {
            return;
        };
        let (sum, count) = approved
            .iter()
            .fold((0.0_f32, 0.0_f32), |(sum, count), rating| {
                (sum + f32::from(*rating), count + 1.0)
            });
        product.review_count = u32::try_from(approved.len()).unwrap_or(u32::MAX);
        product.rating = if approved.is_empty() { 0.0 } else { sum / count };
    }

    pub(crate) fn add_to_cart(&mut self, user: &str, product: &Product, quantity: u32) {
        let line_id = self.next_id("line");
        let lines = self.carts.entry(user.to_string()).or_default();
        if let Some(line) = lines.iter_mut().find(|line| line.product_id == product.id) {
            line.quantity += quantity;
            return;
        }
        lines.push(CartLine {
            id: CartLineId::new(line_id),
            product_id: product.id.clone(),
            quantity,
            product: product.snapshot(),
        });
    }

    pub(crate) fn add_to_wishlist(&mut self, user: &str, product: &Product) {
        let entry_id = self.next_id("wish");
        let entries = self.wishlists.entry(user.to_string()).or_default();
        if entries.iter().any(|entry| entry.product_id == product.id) {
            return;
        }
        entries.push(WishlistEntry {
            id: WishlistEntryId::new(entry_id),
            product_id: product.id.clone(),
            product: product.snapshot(),
            created_at: Some(Utc::now()),
        });
    }

    /// Pop one injected failure for the route, if any is left.
    pub(crate) fn take_fault(&mut self, key: &RouteKey) -> Option<StatusCode> {
        let fault = self.faults.get_mut(key)?;
        fault.remaining = fault.remaining.saturating_sub(1);
        let status = fault.status;
        if fault.remaining == 0 {
            self.faults.remove(key);
        }
        Some(status)
    }

    pub(crate) fn stats(&self) -> Value {
        let orders: Vec<&Value> = self.orders.values().flatten().collect();
        let revenue: Decimal = orders
            .iter()
            .filter_map(|order| order.get("total"))
            .filter_map(|total| serde_json::from_value::<Decimal>(total.clone()).ok())
            .sum();
        let pending = orders
            .iter()
            .filter(|order| order.get("status").and_then(Value::as_str) == Some("pending"))
            .count();
        let low_stock = self
            .products
            .iter()
            .filter(|product| product.stock_quantity < bazaar_storefront::models::LOW_STOCK_THRESHOLD)
            .count();
        json!({
            "totalUsers": self.users.len(),
            "totalProducts": self.products.len(),
            "totalOrders": orders.len(),
            "totalRevenue": revenue,
            "monthlyRevenue": revenue,
            "pendingOrders": pending,
            "lowStockProducts": low_stock,
            "newUsersToday": 0,
        })
    }
}

fn review(id: &str, product: &str, user: &str, user_name: &str, rating: u8) -> Review {
    Review {
        id: ReviewId::new(id),
        product_id: Some(ProductId::new(product)),
        product_name: None,
        user_id: Some(UserId::new(user)),
        user_name: user_name.to_string(),
        rating,
        comment: format!("{rating} stars"),
        is_approved: true,
        is_reported: false,
        report_count: 0,
        created_at: Some(Utc::now()),
    }
}

fn seeded_settings() -> Value {
    let shipping = ShippingPolicy::default();
    json!({
        "siteName": "Bazaar",
        "siteDescription": "Handmade goods",
        "siteUrl": "https://bazaar.example.com",
        "contactEmail": "help@bazaar.example.com",
        "contactPhone": "+90 212 555 0100",
        "freeShippingThreshold": shipping.free_shipping_threshold,
        "shippingCost": shipping.flat_rate,
        "taxRate": Decimal::new(20, 0),
        "paymentMethods": ["credit_card", "bank_transfer"],
        "emailNotifications": true,
        "smtpHost": "mail.bazaar.example.com",
    })
}

fn product(id: &str, name: &str, price: Decimal, sale_price: Option<Decimal>, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name}, handmade."),
        sku: Some(id.to_uppercase()),
        price,
        sale_price,
        images: vec![format!("https://cdn.example.com/{id}.jpg")],
        stock_quantity: stock,
        category: "Kitchen".to_string(),
        brand: "Bazaar".to_string(),
        rating: 4.5,
        review_count: 2,
        status: bazaar_core::ProductStatus::Active,
        specifications: std::collections::BTreeMap::new(),
        created_at: None,
    }
}
