//! Cart and wishlist commands.

use bazaar_core::{CartLineId, ProductId};
use bazaar_storefront::AppState;

use super::emit;
use crate::render;

fn emit_cart(state: &AppState) {
    let cart = state.cart();
    emit(&render::cart(&cart.lines(), cart.total_price(), cart.total_items()));
}

pub async fn cart_show(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().refresh().await?;
    emit_cart(state);
    Ok(())
}

pub async fn cart_add(state: &AppState, product: String, qty: u32) -> Result<(), Box<dyn std::error::Error>> {
    // The merge into an existing line needs the current lines.
    state.cart().refresh().await?;
    state.cart().add_to_cart(&ProductId::new(product), qty).await?;
    emit_cart(state);
    Ok(())
}

pub async fn cart_set(state: &AppState, line: String, qty: u32) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().refresh().await?;
    state
        .cart()
        .update_quantity(&CartLineId::new(line), qty)
        .await?;
    emit_cart(state);
    Ok(())
}

pub async fn cart_remove(state: &AppState, line: String) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().refresh().await?;
    state.cart().remove_from_cart(&CartLineId::new(line)).await?;
    emit_cart(state);
    Ok(())
}

pub async fn cart_clear(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().clear_cart().await?;
    emit("Cart cleared.");
    Ok(())
}

pub async fn wishlist_show(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    state.wishlist().refresh().await?;
    emit(&render::wishlist(&state.wishlist().entries()));
    Ok(())
}

pub async fn wishlist_add(state: &AppState, product: String) -> Result<(), Box<dyn std::error::Error>> {
    state.wishlist().add_to_wishlist(&ProductId::new(product)).await?;
    emit(&render::wishlist(&state.wishlist().entries()));
    Ok(())
}

pub async fn wishlist_remove(state: &AppState, product: String) -> Result<(), Box<dyn std::error::Error>> {
    state
        .wishlist()
        .remove_from_wishlist(&ProductId::new(product))
        .await?;
    emit(&render::wishlist(&state.wishlist().entries()));
    Ok(())
}

pub async fn wishlist_toggle(state: &AppState, product: String) -> Result<(), Box<dyn std::error::Error>> {
    let wishlist = state.wishlist();
    wishlist.refresh().await?;
    let product = ProductId::new(product);
    if wishlist.toggle(&product).await? {
        emit(&format!("Added {product} to your wishlist."));
    } else {
        emit(&format!("Removed {product} from your wishlist."));
    }
    Ok(())
}
