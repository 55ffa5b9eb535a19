//! Product, category and brand management.

use bazaar_core::{BrandId, CategoryId, ProductId};
use bazaar_storefront::api::segment;
use bazaar_storefront::models::{Brand, Category, LOW_STOCK_THRESHOLD, Product};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::AdminClient;
use crate::error::AdminError;
use crate::types::{BrandInput, CategoryInput, ProductInput};

const PRODUCTS: &str = "/admin/products";
const CATEGORIES: &str = "/admin/categories";
const BRANDS: &str = "/admin/brands";

#[derive(Serialize)]
struct StockBody {
    quantity: u32,
}

impl AdminClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// `POST /admin/products`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, invalid input, or adapter errors.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Option<Product>, AdminError> {
        self.require_admin("create products")?;
        input.validate().map_err(AdminError::invalid)?;
        let created = self.api().post(PRODUCTS, input).await?;
        info!("Product created");
        Ok(created)
    }

    /// `PUT /admin/products/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, invalid input, or adapter errors.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(&self, id: &ProductId, input: &ProductInput) -> Result<(), AdminError> {
        self.require_admin("edit products")?;
        input.validate().map_err(AdminError::invalid)?;
        self.api()
            .put_unit(&format!("{PRODUCTS}/{}", segment(id)), Some(input))
            .await?;
        Ok(())
    }

    /// `DELETE /admin/products/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), AdminError> {
        self.require_admin("delete products")?;
        self.api()
            .delete_unit(&format!("{PRODUCTS}/{}", segment(id)))
            .await?;
        info!("Product deleted");
        Ok(())
    }

    /// `PUT /admin/products/{id}/stock`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_product_stock(&self, id: &ProductId, quantity: u32) -> Result<(), AdminError> {
        self.require_admin("adjust stock")?;
        self.api()
            .put_unit(
                &format!("{PRODUCTS}/{}/stock", segment(id)),
                Some(&StockBody { quantity }),
            )
            .await?;
        if quantity < LOW_STOCK_THRESHOLD {
            warn!(quantity, "Stock set below the low-stock threshold");
        }
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// `NotAdmin`, an empty name, or adapter errors.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Option<Category>, AdminError> {
        self.require_admin("create categories")?;
        require_name(&input.name, &input.slug)?;
        Ok(self.api().post(CATEGORIES, input).await?)
    }

    /// # Errors
    ///
    /// `NotAdmin`, an empty name, or adapter errors.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn update_category(&self, id: &CategoryId, input: &CategoryInput) -> Result<(), AdminError> {
        self.require_admin("edit categories")?;
        require_name(&input.name, &input.slug)?;
        self.api()
            .put_unit(&format!("{CATEGORIES}/{}", segment(id)), Some(input))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), AdminError> {
        self.require_admin("delete categories")?;
        self.api()
            .delete_unit(&format!("{CATEGORIES}/{}", segment(id)))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Brands
    // =========================================================================

    /// # Errors
    ///
    /// `NotAdmin`, an empty name, or adapter errors.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_brand(&self, input: &BrandInput) -> Result<Option<Brand>, AdminError> {
        self.require_admin("create brands")?;
        require_name(&input.name, &input.slug)?;
        Ok(self.api().post(BRANDS, input).await?)
    }

    /// # Errors
    ///
    /// `NotAdmin`, an empty name, or adapter errors.
    #[instrument(skip(self, input), fields(brand_id = %id))]
    pub async fn update_brand(&self, id: &BrandId, input: &BrandInput) -> Result<(), AdminError> {
        self.require_admin("edit brands")?;
        require_name(&input.name, &input.slug)?;
        self.api()
            .put_unit(&format!("{BRANDS}/{}", segment(id)), Some(input))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn delete_brand(&self, id: &BrandId) -> Result<(), AdminError> {
        self.require_admin("delete brands")?;
        self.api()
            .delete_unit(&format!("{BRANDS}/{}", segment(id)))
            .await?;
        Ok(())
    }
}

fn require_name(name: &str, slug: &str) -> Result<(), AdminError> {
    if name.trim().is_empty() || slug.trim().is_empty() {
        return Err(AdminError::invalid("name and slug are required"));
    }
    Ok(())
}
