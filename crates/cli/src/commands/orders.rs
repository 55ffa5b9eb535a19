//! Order and checkout commands.

use bazaar_core::{AddressId, OrderId, OrderStatus};
use bazaar_storefront::AppState;
use bazaar_storefront::models::{OrderQuery, ShippingAddress};
use rust_decimal::Decimal;

use super::emit;
use crate::render;

pub async fn list(state: &AppState, status: Option<OrderStatus>) -> Result<(), Box<dyn std::error::Error>> {
    let query = OrderQuery {
        status,
        ..OrderQuery::default()
    };
    let orders = state.orders().orders(&query).await?;
    if orders.is_empty() {
        emit("No orders yet.");
        return Ok(());
    }
    let text: String = orders
        .iter()
        .map(|order| render::order_row(order) + "\n")
        .collect();
    emit(&text);
    Ok(())
}

pub async fn show(state: &AppState, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let order = state.orders().order(&OrderId::new(id)).await?;
    emit(&render::order_detail(&order));
    Ok(())
}

/// Only pending orders are offered for cancellation; the server has the
/// final say either way.
pub async fn cancel(
    state: &AppState,
    id: String,
    reason: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = OrderId::new(id);
    let order = state.orders().order(&id).await?;
    if !order.can_cancel() {
        return Err(format!("order {} is {} and can no longer be cancelled", id, order.status).into());
    }
    state.orders().cancel_order(&id, reason).await?;
    emit(&format!("Order {} cancelled.", order.order_number));
    Ok(())
}

pub async fn track(state: &AppState, tracking_number: &str) -> Result<(), Box<dyn std::error::Error>> {
    let order = state.orders().track(tracking_number).await?;
    emit(&render::order_detail(&order));
    Ok(())
}

pub struct CheckoutRequest {
    pub address: Option<String>,
    pub payment: String,
    pub coupon: Option<String>,
    pub dry_run: bool,
}

pub async fn checkout(state: &AppState, request: CheckoutRequest) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().refresh().await?;
    let cart_total = state.cart().total_price();

    let mut discount = Decimal::ZERO;
    if let Some(code) = request.coupon.as_deref() {
        let validation = state.coupons().validate(code, cart_total).await?;
        if !validation.valid {
            let reason = validation
                .message
                .unwrap_or_else(|| "coupon is not valid".to_string());
            return Err(reason.into());
        }
        discount = validation.discount();
    }

    emit(&render::summary(&state.checkout_summary(discount)));
    if request.dry_run {
        return Ok(());
    }

    let addresses = state.addresses().list().await?;
    let address = match &request.address {
        Some(id) => {
            let id = AddressId::new(id.clone());
            addresses.iter().find(|a| a.id.as_ref() == Some(&id))
        }
        None => addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| addresses.first()),
    }
    .ok_or("no shipping address; add one to your account first")?;

    let order = state
        .checkout(
            ShippingAddress::from(address),
            &request.payment,
            request.coupon.as_deref(),
        )
        .await?;
    emit(&format!(
        "Order {} placed: {}",
        order.order_number,
        render::money(order.total)
    ));
    Ok(())
}
