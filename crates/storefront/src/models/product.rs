//! Catalog records: products, categories, brands and reviews.

use std::collections::BTreeMap;

use bazaar_core::{
    BrandId, CategoryId, OrderId, ProductId, ProductStatus, ReviewId, UserId,
    discount_percentage, effective_price,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Below this many units a product counts as low on stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Availability bucket shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    /// Fewer than [`LOW_STOCK_THRESHOLD`] units left.
    Low(u32),
    InStock,
}

impl StockLevel {
    #[must_use]
    pub const fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            n if n < LOW_STOCK_THRESHOLD => Self::Low(n),
            _ => Self::InStock,
        }
    }

    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }
}

/// The product fields embedded in cart lines and wishlist entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, alias = "salePrice", skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "stockQuantity", alias = "stock")]
    pub stock_quantity: u32,
}

impl ProductSnapshot {
    /// Sale price when set, list price otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        discount_percentage(self.price, self.sale_price)
    }

    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::from_quantity(self.stock_quantity)
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A full catalog record as returned by `/products` and `/products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default, alias = "salePrice", skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "stockQuantity", alias = "stock")]
    pub stock_quantity: u32,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Brand name.
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default, alias = "reviewCount")]
    pub review_count: u32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    /// Whole-percent badge value, 0 when not on sale.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        discount_percentage(self.price, self.sale_price)
    }

    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::from_quantity(self.stock_quantity)
    }

    /// The subset embedded in cart lines.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            sale_price: self.sale_price,
            images: self.images.clone(),
            stock_quantity: self.stock_quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filters and paging for product listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    /// Query-string pairs in the API's camelCase names. Unset filters are omitted.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(brand) = &self.brand {
            pairs.push(("brand", brand.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            let order = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            pairs.push(("sortOrder", order.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
    #[serde(default)]
    pub product_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub product_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

/// A product review. Storefront listings use snake_case, the back office
/// camelCase; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    #[serde(default, alias = "product_id", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, alias = "product_name", skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "user_name")]
    pub user_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default, alias = "is_approved")]
    pub is_approved: bool,
    #[serde(default, alias = "is_reported")]
    pub is_reported: bool,
    #[serde(default, alias = "report_count")]
    pub report_count: u32,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /products/{id}/reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
    pub order_id: OrderId,
}

impl NewReview {
    /// Ratings run from 1 to 5 stars.
    pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

    #[must_use]
    pub fn has_valid_rating(&self) -> bool {
        Self::RATING_RANGE.contains(&self.rating)
    }
}

/// Body of `PUT /reviews/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
