//! Admin statistics and user management against the mock API.

#![allow(clippy::unwrap_used)]

use bazaar_admin::{AdminClient, AdminError, AdminStatsStore, UserQuery};
use bazaar_core::{ProductId, UserId};
use bazaar_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, GLASS, Method, MockApi, SHOPPER_EMAIL, SHOPPER_ID,
    SHOPPER_PASSWORD, sign_in,
};
use bazaar_storefront::ClientError;
use bazaar_storefront::models::ShippingAddress;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_shopper_is_not_admin() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    let stats = AdminStatsStore::new(shop.session());

    let err = stats.refresh_stats().await.unwrap_err();

    assert!(matches!(err, AdminError::NotAdmin));
    assert!(stats.stats().is_none());
    assert_eq!(api.hits(Method::GET, "/admin/dashboard/stats"), 0);
}

#[tokio::test]
async fn test_admin_sees_store_counters() {
    let api = MockApi::start().await;

    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    shop.cart().add_to_cart(&ProductId::new(GLASS), 2).await.unwrap();
    shop.checkout(ShippingAddress::default(), "credit_card", None)
        .await
        .unwrap();

    let back_office = api.client();
    sign_in(&back_office, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let store = AdminStatsStore::new(back_office.session());

    let stats = store.refresh_stats().await.unwrap();

    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.low_stock_products, 1);
    assert_eq!(stats.total_revenue, Decimal::new(12990, 2));
    assert_eq!(store.stats(), Some(stats));

    back_office.session().sign_out();
    assert!(store.stats().is_none());
}

#[tokio::test]
async fn test_ban_blocks_the_shopper() {
    let api = MockApi::start().await;
    let back_office = api.client();
    sign_in(&back_office, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let admin = AdminClient::new(back_office.session());

    let users = admin.users(&UserQuery::default()).await.unwrap();
    assert_eq!(users.len(), 3);

    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;

    admin
        .ban_user(&UserId::new(SHOPPER_ID), Some("chargebacks"))
        .await
        .unwrap();
    assert!(!api.is_active(SHOPPER_ID));
    let err = shop.cart().refresh().await.unwrap_err();
    assert_eq!(err.status(), Some(403));

    admin.unban_user(&UserId::new(SHOPPER_ID)).await.unwrap();
    shop.cart().refresh().await.unwrap();
}

#[tokio::test]
async fn test_admin_cannot_ban_themselves() {
    let api = MockApi::start().await;
    let back_office = api.client();
    sign_in(&back_office, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let admin = AdminClient::new(back_office.session());
    let own_id = back_office.session().current_user_id().unwrap();

    let err = admin.ban_user(&own_id, None).await.unwrap_err();

    assert!(matches!(
        err,
        AdminError::Client(ClientError::InvalidInput(_))
    ));
    assert!(api.is_active(own_id.as_str()));
}

#[tokio::test]
async fn test_shopper_is_refused_admin_calls_locally() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    let admin = AdminClient::new(shop.session());

    let err = admin.users(&UserQuery::default()).await.unwrap_err();

    assert!(matches!(err, AdminError::NotAdmin));
    assert_eq!(api.hits(Method::GET, "/admin/users"), 0);
}
