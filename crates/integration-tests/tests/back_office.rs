//! Catalog, coupon, review, order and settings management against the mock
//! API, checked from both the admin and the shopper side.

#![allow(clippy::unwrap_used)]

use bazaar_admin::{
    AdminClient, AdminError, AdminStatsStore, BrandInput, CategoryInput, CouponInput,
    ProductInput, ReviewFilter,
};
use bazaar_core::{
    BrandId, CategoryId, CouponKind, OrderId, OrderStatus, ProductId, ProductStatus, ReviewId,
};
use bazaar_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, GLASS, HOUSE_BRAND, KITCHEN, Method, MockApi, SHOPPER_EMAIL,
    SHOPPER_PASSWORD, sign_in,
};
use bazaar_storefront::models::{NewReview, ShippingAddress};
use bazaar_storefront::{AppState, ClientError};
use rust_decimal::Decimal;

async fn back_office(api: &MockApi) -> (AppState, AdminClient) {
    let state = api.client();
    sign_in(&state, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let admin = AdminClient::new(state.session());
    (state, admin)
}

async fn shopper(api: &MockApi) -> AppState {
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    shop
}

fn status(err: &AdminError) -> Option<u16> {
    match err {
        AdminError::Client(e) => e.status(),
        AdminError::NotAdmin => None,
    }
}

fn is_invalid(err: &AdminError) -> bool {
    matches!(err, AdminError::Client(ClientError::InvalidInput(_)))
}

fn teapot(price: i64, stock: u32) -> ProductInput {
    ProductInput {
        name: "Demlik".to_string(),
        description: Some("Two-tier teapot".to_string()),
        sku: "DEM-1".to_string(),
        price: Decimal::new(price, 0),
        sale_price: None,
        stock_quantity: stock,
        category_id: Some(CategoryId::new(KITCHEN)),
        brand_id: Some(BrandId::new(HOUSE_BRAND)),
        status: ProductStatus::Active,
        images: Vec::new(),
    }
}

fn coupon(code: &str, value: i64, is_active: bool) -> CouponInput {
    CouponInput {
        code: code.to_string(),
        kind: CouponKind::Percentage,
        value: Decimal::new(value, 0),
        min_order_amount: None,
        max_discount_amount: None,
        usage_limit: None,
        is_active,
        valid_from: None,
        valid_until: None,
        description: None,
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_product_lifecycle_reaches_shoppers() {
    let api = MockApi::start().await;
    let (back, admin) = back_office(&api).await;
    let shop = api.client();

    let created = admin.create_product(&teapot(240, 10)).await.unwrap().unwrap();
    assert_eq!(created.category, "Kitchen");
    assert_eq!(created.brand, "Bazaar");

    let seen = shop.catalog().product(&created.id).await.unwrap();
    assert_eq!(seen.name, "Demlik");
    assert_eq!(seen.price, Decimal::new(240, 0));

    admin.update_product(&created.id, &teapot(260, 10)).await.unwrap();
    shop.catalog().invalidate_product(&created.id).await;
    let seen = shop.catalog().product(&created.id).await.unwrap();
    assert_eq!(seen.price, Decimal::new(260, 0));

    admin.update_product_stock(&created.id, 2).await.unwrap();
    let stats = AdminStatsStore::new(back.session())
        .refresh_stats()
        .await
        .unwrap();
    assert_eq!(stats.total_products, 4);
    assert_eq!(stats.low_stock_products, 2);

    admin.delete_product(&created.id).await.unwrap();
    shop.catalog().invalidate_product(&created.id).await;
    let err = shop.catalog().product(&created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_invalid_product_is_refused_locally() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let mut input = teapot(240, 10);
    input.sale_price = Some(Decimal::new(300, 0));
    let err = admin.create_product(&input).await.unwrap_err();
    assert!(is_invalid(&err));

    let err = admin
        .update_product(&ProductId::new(GLASS), &teapot(0, 10))
        .await
        .unwrap_err();
    assert!(is_invalid(&err));

    assert_eq!(api.hits(Method::POST, "/admin/products"), 0);
    assert_eq!(api.hits(Method::PUT, "/admin/products/p-1"), 0);
}

#[tokio::test]
async fn test_duplicate_sku_is_a_conflict() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    admin.create_product(&teapot(240, 10)).await.unwrap();
    let err = admin.create_product(&teapot(250, 5)).await.unwrap_err();

    assert_eq!(status(&err), Some(409));
}

#[tokio::test]
async fn test_categories_and_brands_lifecycle() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let category = admin
        .create_category(&CategoryInput::named("Tea Sets"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(category.slug, "tea-sets");

    let shop = api.client();
    assert_eq!(shop.catalog().categories().await.unwrap().len(), 2);

    let renamed = CategoryInput {
        slug: "tea-sets".to_string(),
        ..CategoryInput::named("Tea Sets & Trays")
    };
    admin.update_category(&category.id, &renamed).await.unwrap();
    let fresh = api.client();
    let seen = fresh.catalog().category(&category.id).await.unwrap();
    assert_eq!(seen.name, "Tea Sets & Trays");

    let err = admin
        .create_category(&CategoryInput::named("Tea sets"))
        .await
        .unwrap_err();
    assert_eq!(status(&err), Some(409));

    admin.delete_category(&category.id).await.unwrap();
    let err = api
        .client()
        .catalog()
        .category(&category.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    let brand = admin
        .create_brand(&BrandInput::named("Karaköy Bakırcılık"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(brand.slug, "karak-y-bak-rc-l-k");
    admin
        .update_brand(&brand.id, &BrandInput::named("Karaköy Copper"))
        .await
        .unwrap();
    assert_eq!(api.client().catalog().brands().await.unwrap().len(), 2);
    admin.delete_brand(&brand.id).await.unwrap();
    assert_eq!(api.client().catalog().brands().await.unwrap().len(), 1);

    let err = admin.delete_brand(&brand.id).await.unwrap_err();
    assert_eq!(status(&err), Some(404));
}

#[tokio::test]
async fn test_blank_category_name_is_refused_locally() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let err = admin
        .create_category(&CategoryInput::named("  "))
        .await
        .unwrap_err();

    assert!(is_invalid(&err));
    assert_eq!(api.hits(Method::POST, "/admin/categories"), 0);
}

// =============================================================================
// Coupons
// =============================================================================

#[tokio::test]
async fn test_coupon_lifecycle() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;
    let shop = api.client();

    let created = admin
        .create_coupon(&coupon("  spring25 ", 25, true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.code, "SPRING25");
    assert_eq!(admin.coupons().await.unwrap().len(), 2);

    let check = shop
        .coupons()
        .validate("spring25", Decimal::new(100, 0))
        .await
        .unwrap();
    assert_eq!(check.discount(), Decimal::new(25, 0));

    admin
        .update_coupon(&created.id, &coupon("spring25", 25, false))
        .await
        .unwrap();
    let check = shop
        .coupons()
        .validate("SPRING25", Decimal::new(100, 0))
        .await
        .unwrap();
    assert!(!check.valid);

    admin.delete_coupon(&created.id).await.unwrap();
    assert_eq!(admin.coupons().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_coupon_is_refused_locally() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let err = admin
        .create_coupon(&coupon("HALF", 150, true))
        .await
        .unwrap_err();

    assert!(is_invalid(&err));
    assert_eq!(api.hits(Method::POST, "/admin/coupons"), 0);
}

#[tokio::test]
async fn test_shopper_cannot_manage_coupons() {
    let api = MockApi::start().await;
    let shop = shopper(&api).await;
    let admin = AdminClient::new(shop.session());

    let err = admin.coupons().await.unwrap_err();

    assert!(matches!(err, AdminError::NotAdmin));
    assert_eq!(api.hits(Method::GET, "/admin/coupons"), 0);
}

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn test_review_moderation() {
    let api = MockApi::start().await;
    let shop = shopper(&api).await;
    let glass = ProductId::new(GLASS);
    shop.cart().add_to_cart(&glass, 1).await.unwrap();
    let order = shop
        .checkout(ShippingAddress::default(), "credit_card", None)
        .await
        .unwrap();
    let review = NewReview {
        rating: 3,
        comment: "Chipped on arrival".to_string(),
        order_id: order.id,
    };
    let created = shop
        .catalog()
        .create_review(&glass, &review)
        .await
        .unwrap()
        .unwrap();

    let (_back, admin) = back_office(&api).await;
    let pending = admin.reviews(ReviewFilter::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.first().unwrap().id, created.id);
    assert_eq!(admin.reviews(ReviewFilter::All).await.unwrap().len(), 3);

    admin.approve_review(&created.id).await.unwrap();
    assert_eq!(shop.catalog().reviews(&glass).await.unwrap().len(), 3);
    assert_eq!(admin.reviews(ReviewFilter::Approved).await.unwrap().len(), 3);
    let product = api.client().catalog().product(&glass).await.unwrap();
    assert_eq!(product.review_count, 3);
    assert!((product.rating - 4.0).abs() < f32::EPSILON);

    admin.reject_review(&created.id).await.unwrap();
    assert_eq!(shop.catalog().reviews(&glass).await.unwrap().len(), 2);

    admin.delete_review(&ReviewId::new("r-2")).await.unwrap();
    assert_eq!(shop.catalog().reviews(&glass).await.unwrap().len(), 1);
    assert_eq!(api.hits(Method::GET, "/admin/reviews"), 3);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_fulfilment_is_visible_to_the_shopper() {
    let api = MockApi::start().await;
    let shop = shopper(&api).await;
    shop.cart().add_to_cart(&ProductId::new(GLASS), 1).await.unwrap();
    let order = shop
        .checkout(ShippingAddress::default(), "credit_card", None)
        .await
        .unwrap();

    let (_back, admin) = back_office(&api).await;
    admin
        .update_order_status(&order.id, OrderStatus::Shipped, Some("  left the warehouse "))
        .await
        .unwrap();
    admin
        .assign_tracking_number(&order.id, " TRK-1 ", "Aras")
        .await
        .unwrap();

    let tracked = shop.orders().track("TRK-1").await.unwrap();
    assert_eq!(tracked.id, order.id);
    assert_eq!(tracked.status, OrderStatus::Shipped);
    assert_eq!(tracked.tracking_number.as_deref(), Some("TRK-1"));
    assert!(!tracked.can_cancel());

    let err = shop.orders().cancel_order(&order.id, None).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(api.order_status(order.id.as_str()).as_deref(), Some("shipped"));
}

#[tokio::test]
async fn test_blank_carrier_is_refused_locally() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let err = admin
        .assign_tracking_number(&OrderId::new("o-1"), "TRK-1", "  ")
        .await
        .unwrap_err();

    assert!(is_invalid(&err));
    assert_eq!(api.hits(Method::PUT, "/admin/orders/o-1/tracking"), 0);
}

#[tokio::test]
async fn test_unknown_order_status_update_is_not_found() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let err = admin
        .update_order_status(&OrderId::new("o-missing"), OrderStatus::Confirmed, None)
        .await
        .unwrap_err();

    assert_eq!(status(&err), Some(404));
}

// =============================================================================
// Settings and reports
// =============================================================================

#[tokio::test]
async fn test_settings_update_keeps_unmodelled_fields() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let mut settings = admin.settings().await.unwrap();
    assert_eq!(settings.site_name, "Bazaar");
    assert!(settings.extra.contains_key("smtpHost"));

    settings.shipping_cost = Decimal::new(35, 0);
    admin.update_settings(&settings).await.unwrap();

    let reread = admin.settings().await.unwrap();
    assert_eq!(reread.shipping_cost, Decimal::new(35, 0));
    assert_eq!(reread.shipping_policy().flat_rate, Decimal::new(35, 0));
    assert_eq!(
        reread.extra.get("smtpHost").and_then(serde_json::Value::as_str),
        Some("mail.bazaar.example.com")
    );
}

#[tokio::test]
async fn test_negative_shipping_is_refused_locally() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let mut settings = admin.settings().await.unwrap();
    settings.shipping_cost = Decimal::new(-1, 0);
    let err = admin.update_settings(&settings).await.unwrap_err();

    assert!(is_invalid(&err));
    assert_eq!(api.hits(Method::PUT, "/admin/settings"), 0);
}

#[tokio::test]
async fn test_sales_report_passes_parameters() {
    let api = MockApi::start().await;
    let (_back, admin) = back_office(&api).await;

    let report = admin
        .report("sales", &[("from", "2026-01-01"), ("to", "2026-03-31")])
        .await
        .unwrap();

    assert_eq!(report["kind"], "sales");
    assert_eq!(report["params"]["from"], "2026-01-01");

    let err = admin.report("weather", &[]).await.unwrap_err();
    assert_eq!(status(&err), Some(404));
}
