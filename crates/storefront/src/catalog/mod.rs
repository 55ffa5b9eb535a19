//! Catalog browsing: products, categories, brands and reviews.
//!
//! Product details, the featured list, categories and brands are cached for
//! the configured TTL. Review writes invalidate the product they belong to.

mod cache;

pub use cache::{CacheKey, CacheValue};

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{CategoryId, ProductId, ReviewId};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::{ApiClient, segment, with_query};
use crate::error::ClientError;
use crate::models::{Brand, Category, NewReview, Product, ProductQuery, Review, ReviewUpdate};
use crate::session::Session;

// =============================================================================
// CatalogClient
// =============================================================================

/// Read access to the public catalog plus the shopper's own reviews.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    session: Session,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    #[must_use]
    pub fn new(session: &Session, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                session: session.clone(),
                cache,
            }),
        }
    }

    fn api(&self) -> &ApiClient {
        self.inner.session.api()
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Drop the cached detail for one product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner.cache.invalidate(&CacheKey::Product(id.clone())).await;
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// `GET /products` with filters. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        self.api()
            .get_list(&with_query("/products", &query.pairs()))
            .await
    }

    /// `GET /products/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `MissingData` if the product does not exist or the API request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ClientError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .api()
            .get_path(&format!("/products/{}", segment(id)))
            .await?
            .ok_or(ClientError::MissingData("/products/{id}"))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// `GET /products/featured`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured(&self) -> Result<Vec<Product>, ClientError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Featured).await
        {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let products: Vec<Product> = self.api().get_list("/products/featured").await?;
        self.inner
            .cache
            .insert(CacheKey::Featured, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// `GET /products/category/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %category))]
    pub async fn by_category(
        &self,
        category: &CategoryId,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, ClientError> {
        let path = format!("/products/category/{}", segment(category));
        self.api().get_list(&with_query(&path, &query.pairs())).await
    }

    /// `GET /products/search?q=`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank query, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn search(&self, q: &str, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        let q = q.trim();
        if q.is_empty() {
            return Err(ClientError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }
        let mut pairs = vec![("q", q.to_string())];
        pairs.extend(query.pairs());
        self.api()
            .get_list(&with_query("/products/search", &pairs))
            .await
    }

    // =========================================================================
    // Categories & brands
    // =========================================================================

    /// `GET /categories`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.api().get_list("/categories").await?;
        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// `GET /categories/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `MissingData` if the category does not exist or the API request
    /// fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: &CategoryId) -> Result<Category, ClientError> {
        let key = CacheKey::Category(id.clone());
        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let category: Category = self
            .api()
            .get_path(&format!("/categories/{}", segment(id)))
            .await?
            .ok_or(ClientError::MissingData("/categories/{id}"))?;
        self.inner
            .cache
            .insert(key, CacheValue::Category(Box::new(category.clone())))
            .await;
        Ok(category)
    }

    /// `GET /brands`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, ClientError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let brands: Vec<Brand> = self.api().get_list("/brands").await?;
        self.inner
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(brands.clone()))
            .await;
        Ok(brands)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// `GET /products/{id}/reviews`. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn reviews(&self, product: &ProductId) -> Result<Vec<Review>, ClientError> {
        self.api()
            .get_list(&format!("/products/{}/reviews", segment(product)))
            .await
    }

    /// `POST /products/{id}/reviews`. Needs a signed-in shopper.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `InvalidInput` for a rating outside 1 to 5, or API
    /// errors.
    #[instrument(skip(self, review), fields(product_id = %product))]
    pub async fn create_review(
        &self,
        product: &ProductId,
        review: &NewReview,
    ) -> Result<Option<Review>, ClientError> {
        self.inner.session.require_identity("write a review")?;
        if !review.has_valid_rating() {
            return Err(ClientError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let created = self
            .api()
            .post(&format!("/products/{}/reviews", segment(product)), review)
            .await?;
        self.invalidate_product(product).await;
        Ok(created)
    }

    /// `PUT /reviews/{id}`. `product` is only used to invalidate its cache entry.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` or API errors.
    #[instrument(skip(self, update), fields(review_id = %id))]
    pub async fn update_review(
        &self,
        id: &ReviewId,
        product: Option<&ProductId>,
        update: &ReviewUpdate,
    ) -> Result<(), ClientError> {
        self.inner.session.require_identity("edit a review")?;
        if update.rating.is_some_and(|r| !NewReview::RATING_RANGE.contains(&r)) {
            return Err(ClientError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        self.api()
            .put_unit(&format!("/reviews/{}", segment(id)), Some(update))
            .await?;
        if let Some(product) = product {
            self.invalidate_product(product).await;
        }
        Ok(())
    }

    /// `DELETE /reviews/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` or API errors.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(
        &self,
        id: &ReviewId,
        product: Option<&ProductId>,
    ) -> Result<(), ClientError> {
        self.inner.session.require_identity("delete a review")?;
        self.api()
            .delete_unit(&format!("/reviews/{}", segment(id)))
            .await?;
        if let Some(product) = product {
            self.invalidate_product(product).await;
        }
        Ok(())
    }
}
