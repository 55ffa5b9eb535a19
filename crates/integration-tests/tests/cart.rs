//! Cart behaviour against the mock API.

#![allow(clippy::unwrap_used)]

use bazaar_core::ProductId;
use bazaar_integration_tests::{
    COFFEE, GLASS, Method, MockApi, POT, SHOPPER_EMAIL, SHOPPER_ID, SHOPPER_PASSWORD, StatusCode,
    sign_in,
};
use bazaar_storefront::models::ShippingAddress;
use bazaar_storefront::{AppState, ClientError};
use rust_decimal::Decimal;

async fn signed_in(api: &MockApi) -> AppState {
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    shop
}

fn id(raw: &str) -> ProductId {
    ProductId::new(raw)
}

#[tokio::test]
async fn test_totals_use_sale_prices() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;

    shop.cart().add_to_cart(&id(GLASS), 2).await.unwrap();
    shop.cart().add_to_cart(&id(COFFEE), 2).await.unwrap();

    assert_eq!(shop.cart().lines().len(), 2);
    assert_eq!(shop.cart().total_items(), 4);
    assert_eq!(shop.cart().total_price(), Decimal::new(210, 0));

    let summary = shop.checkout_summary(Decimal::ZERO);
    assert_eq!(summary.shipping, Decimal::new(2990, 2));
    assert_eq!(summary.total, Decimal::new(23990, 2));
}

#[tokio::test]
async fn test_single_add_of_two_is_one_line() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;

    shop.cart().add_to_cart(&id(GLASS), 2).await.unwrap();

    assert_eq!(shop.cart().lines().len(), 1);
    assert_eq!(shop.cart().total_items(), 2);
    assert_eq!(shop.cart().line_for(&id(GLASS)).unwrap().quantity, 2);
}

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;

    shop.cart().add_to_cart(&id(GLASS), 1).await.unwrap();
    shop.cart().add_to_cart(&id(GLASS), 1).await.unwrap();

    let lines = shop.cart().lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(shop.cart().total_items(), 2);
    assert_eq!(api.hits(Method::POST, "/cart/items"), 1);
    assert_eq!(api.server_cart(SHOPPER_ID).first().unwrap().quantity, 2);
}

#[tokio::test]
async fn test_concurrent_adds_of_one_product_keep_one_line() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;
    let glass = id(GLASS);

    let (first, second) = tokio::join!(
        shop.cart().add_to_cart(&glass, 1),
        shop.cart().add_to_cart(&glass, 2)
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(shop.cart().lines().len(), 1);
    assert_eq!(shop.cart().total_items(), 3);
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;
    shop.cart().add_to_cart(&id(POT), 1).await.unwrap();
    let line = shop.cart().line_for(&id(POT)).unwrap();

    shop.cart().update_quantity(&line.id, 0).await.unwrap();

    assert!(shop.cart().is_empty());
    assert!(api.server_cart(SHOPPER_ID).is_empty());
    assert_eq!(api.hits(Method::DELETE, &format!("/cart/items/{}", line.id)), 1);
}

#[tokio::test]
async fn test_anonymous_add_is_refused_without_a_request() {
    let api = MockApi::start().await;
    let shop = api.client();
    shop.session().restore().await;

    let err = shop.cart().add_to_cart(&id(GLASS), 1).await.unwrap_err();

    assert!(matches!(err, ClientError::NotAuthenticated(_)));
    assert!(shop.cart().is_empty());
    assert_eq!(api.hits(Method::POST, "/cart/items"), 0);
}

#[tokio::test]
async fn test_server_rejection_keeps_local_lines() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;
    shop.cart().add_to_cart(&id(GLASS), 1).await.unwrap();

    let err = shop.cart().add_to_cart(&id(POT), 5).await.unwrap_err();

    assert_eq!(err.to_string(), "Insufficient stock");
    assert_eq!(err.status(), Some(400));
    assert_eq!(shop.cart().lines().len(), 1);
}

#[tokio::test]
async fn test_failed_refetch_reports_resync_and_marks_stale() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;
    api.fail_next(Method::GET, "/cart", StatusCode::SERVICE_UNAVAILABLE, 2);

    let err = shop.cart().add_to_cart(&id(GLASS), 1).await.unwrap_err();

    assert!(matches!(err, ClientError::Resync(_)));
    assert!(shop.cart().is_stale());
    assert_eq!(api.server_cart(SHOPPER_ID).len(), 1);

    shop.cart().refresh().await.unwrap();
    assert!(!shop.cart().is_stale());
    assert_eq!(shop.cart().total_items(), 1);
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let api = MockApi::start().await;
    let shop = signed_in(&api).await;
    shop.cart().add_to_cart(&id(GLASS), 2).await.unwrap();
    shop.cart().add_to_cart(&id(COFFEE), 2).await.unwrap();

    let address = ShippingAddress {
        name: "Ayşe Yılmaz".to_string(),
        address: "Moda Cd. 12".to_string(),
        city: "İstanbul".to_string(),
        district: "Kadıköy".to_string(),
        postal_code: "34710".to_string(),
        phone: "+90 555 000 0000".to_string(),
    };
    let order = shop.checkout(address, "credit_card", None).await.unwrap();

    assert_eq!(order.total, Decimal::new(23990, 2));
    assert_eq!(order.total_items(), 4);
    assert!(order.can_cancel());
    assert!(shop.cart().is_empty());
    assert!(api.server_cart(SHOPPER_ID).is_empty());
    assert_eq!(api.order_count(SHOPPER_ID), 1);

    let empty = shop
        .checkout(ShippingAddress::default(), "credit_card", None)
        .await
        .unwrap_err();
    assert!(matches!(empty, ClientError::InvalidInput(_)));
}
