//! Retries, timeouts and caching against the mock API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bazaar_core::ProductId;
use bazaar_integration_tests::{
    GLASS, Method, MockApi, SHOPPER_EMAIL, SHOPPER_PASSWORD, StatusCode, sign_in,
};
use bazaar_storefront::ClientError;

#[tokio::test]
async fn test_get_is_retried_after_server_error() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    api.fail_next(Method::GET, "/cart", StatusCode::BAD_GATEWAY, 1);

    shop.cart().refresh().await.unwrap();

    assert_eq!(api.hits(Method::GET, "/cart"), 2);
    assert!(!shop.cart().is_stale());
}

#[tokio::test]
async fn test_get_gives_up_after_max_attempts() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    api.fail_next(Method::GET, "/cart", StatusCode::INTERNAL_SERVER_ERROR, 5);

    let err = shop.cart().refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(api.hits(Method::GET, "/cart"), 2);
}

#[tokio::test]
async fn test_post_is_sent_once() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    api.fail_next(Method::POST, "/cart/items", StatusCode::SERVICE_UNAVAILABLE, 1);

    let err = shop
        .cart()
        .add_to_cart(&ProductId::new(GLASS), 1)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(api.hits(Method::POST, "/cart/items"), 1);
    assert!(shop.cart().is_empty());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let api = MockApi::start().await;
    let shop = api.client();

    let err = shop
        .catalog()
        .product(&ProductId::new("missing"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(api.hits(Method::GET, "/products/missing"), 1);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    api.delay(Method::GET, "/cart", Duration::from_secs(3));

    let err = shop.cart().refresh().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
    assert!(shop.session().is_authenticated());
}

#[tokio::test]
async fn test_product_lookups_are_cached() {
    let api = MockApi::start().await;
    let shop = api.client();
    let glass = ProductId::new(GLASS);

    let first = shop.catalog().product(&glass).await.unwrap();
    let second = shop.catalog().product(&glass).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(api.hits(Method::GET, "/products/p-1"), 1);

    shop.catalog().invalidate_product(&glass).await;
    shop.catalog().product(&glass).await.unwrap();
    assert_eq!(api.hits(Method::GET, "/products/p-1"), 2);
}

#[tokio::test]
async fn test_featured_list_is_cached() {
    let api = MockApi::start().await;
    let shop = api.client();

    assert_eq!(shop.catalog().featured().await.unwrap().len(), 3);
    assert_eq!(shop.catalog().featured().await.unwrap().len(), 3);
    assert_eq!(api.hits(Method::GET, "/products/featured"), 1);
}
