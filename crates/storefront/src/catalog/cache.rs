//! Cache types for catalog responses.

use bazaar_core::{CategoryId, ProductId};

use crate::models::{Brand, Category, Product};

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Featured,
    Categories,
    Category(CategoryId),
    Brands,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Category(Box<Category>),
    Categories(Vec<Category>),
    Brands(Vec<Brand>),
}
