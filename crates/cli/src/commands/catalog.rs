//! Catalog browsing commands.

use bazaar_core::ProductId;
use bazaar_storefront::AppState;
use bazaar_storefront::models::{Product, ProductQuery};

use super::emit;
use crate::render;

fn emit_products(products: &[Product]) {
    if products.is_empty() {
        emit("No products found.");
        return;
    }
    let text: String = products
        .iter()
        .map(|product| render::product_row(product) + "\n")
        .collect();
    emit(&text);
}

pub async fn list(state: &AppState, query: &ProductQuery) -> Result<(), Box<dyn std::error::Error>> {
    emit_products(&state.catalog().products(query).await?);
    Ok(())
}

pub async fn featured(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    emit_products(&state.catalog().featured().await?);
    Ok(())
}

pub async fn search(state: &AppState, query: &str) -> Result<(), Box<dyn std::error::Error>> {
    emit_products(
        &state
            .catalog()
            .search(query, &ProductQuery::default())
            .await?,
    );
    Ok(())
}

pub async fn show(state: &AppState, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    let product = state.catalog().product(&id).await?;
    let reviews = state.catalog().reviews(&id).await?;
    emit(&render::product_detail(&product, &reviews));
    Ok(())
}

pub async fn categories(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let text: String = state
        .catalog()
        .categories()
        .await?
        .iter()
        .map(|c| format!("{:<10} {:<30} {} products\n", c.id, c.name, c.product_count))
        .collect();
    emit(&text);
    Ok(())
}

pub async fn brands(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let text: String = state
        .catalog()
        .brands()
        .await?
        .iter()
        .map(|b| format!("{:<10} {:<30} {} products\n", b.id, b.name, b.product_count))
        .collect();
    emit(&text);
    Ok(())
}
