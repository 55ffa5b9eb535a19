//! Handlers for the mock REST API.
//!
//! Responses use the same `{success, data, message}` envelope as the real
//! API. Authenticated routes answer 401 without a known bearer token.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use bazaar_admin::Coupon;
use bazaar_core::{
    AddressId, BrandId, CartLineId, CategoryId, CouponId, Envelope, NotificationId, OrderStatus,
    ProductId, ProductStatus, ReviewId, ShippingPolicy, UserId,
};
use bazaar_storefront::models::{Address, Brand, Category, Product, Review};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::store::{EmailToken, MockUser, Store};
use crate::{API_PREFIX, MockState};

type Shared = State<Arc<MockState>>;

pub(crate) fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/user/profile", get(profile).put(update_profile))
        .route("/user/change-password", post(change_password))
        // Addresses
        .route("/user/addresses", get(addresses).post(create_address))
        .route("/user/addresses/{id}", put(update_address).delete(delete_address))
        // Catalog
        .route("/products/featured", get(featured))
        .route("/products/{id}", get(product))
        .route("/products/{id}/reviews", get(product_reviews).post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route("/categories", get(categories))
        .route("/categories/{id}", get(category))
        .route("/brands", get(brands))
        .route("/coupons/validate", post(validate_coupon))
        // Cart
        .route("/cart", get(cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/{id}", put(set_cart_item).delete(remove_cart_item))
        .route("/cart/clear", delete(clear_cart))
        // Wishlist
        .route("/wishlist", get(wishlist))
        .route("/wishlist/items", post(add_wishlist_item))
        .route("/wishlist/items/{id}", delete(remove_wishlist_item))
        // Notifications
        .route("/notifications", get(notifications))
        .route("/notifications/read-all", put(read_all_notifications))
        .route("/notifications/{id}/read", put(read_notification))
        // Orders
        .route("/orders", get(orders).post(create_order))
        .route("/orders/{id}", get(order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/track/{number}", get(track_order))
        // Admin
        .route("/admin/dashboard/stats", get(admin_stats))
        .route("/admin/users", get(admin_users))
        .route("/admin/users/{id}/ban", post(ban_user))
        .route("/admin/users/{id}/unban", post(unban_user))
        .route("/admin/products", post(admin_create_product))
        .route("/admin/products/{id}", put(admin_update_product).delete(admin_delete_product))
        .route("/admin/products/{id}/stock", put(admin_set_stock))
        .route("/admin/categories", post(admin_create_category))
        .route("/admin/categories/{id}", put(admin_update_category).delete(admin_delete_category))
        .route("/admin/brands", post(admin_create_brand))
        .route("/admin/brands/{id}", put(admin_update_brand).delete(admin_delete_brand))
        .route("/admin/coupons", get(admin_coupons).post(admin_create_coupon))
        .route("/admin/coupons/{id}", put(admin_update_coupon).delete(admin_delete_coupon))
        .route("/admin/reviews", get(admin_reviews))
        .route("/admin/reviews/{id}", delete(admin_delete_review))
        .route("/admin/reviews/{id}/approve", put(approve_review))
        .route("/admin/reviews/{id}/reject", put(reject_review))
        .route("/admin/orders/{id}/status", put(admin_order_status))
        .route("/admin/orders/{id}/tracking", put(admin_order_tracking))
        .route("/admin/settings", get(admin_settings).put(admin_update_settings))
        .route("/admin/reports/{kind}", get(admin_report))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(axum::middleware::from_fn_with_state(state, scripted_behaviour))
}

// =============================================================================
// Middleware
// =============================================================================

/// Count the hit, then apply any scripted delay or failure for the route.
async fn scripted_behaviour(State(state): Shared, request: Request, next: Next) -> Response {
    let key = (
        request.method().clone(),
        request
            .uri()
            .path()
            .trim_start_matches(API_PREFIX)
            .to_string(),
    );

    let (delay, fault) = state.with_store(|store| {
        *store.hits.entry(key.clone()).or_default() += 1;
        (store.delays.get(&key).copied(), store.take_fault(&key))
    });

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = fault {
        debug!(method = %key.0, path = %key.1, %status, "Injected failure");
        return failure(status, "Injected failure");
    }
    next.run(request).await
}

// =============================================================================
// Helpers
// =============================================================================

fn ok(data: impl Serialize) -> Response {
    Json(Envelope::ok(data)).into_response()
}

fn done() -> Response {
    Json(json!({ "success": true })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(Envelope::<()>::failure(message))).into_response()
}

/// The signed-in caller, or the 401/403 response to send instead.
fn caller(state: &MockState, headers: &HeaderMap) -> Result<MockUser, Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let user = state
        .with_store(|store| store.user_by_token(token).cloned())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;
    if !user.is_active {
        return Err(failure(StatusCode::FORBIDDEN, "Account is disabled"));
    }
    Ok(user)
}

fn admin(state: &MockState, headers: &HeaderMap) -> Result<MockUser, Response> {
    let user = caller(state, headers)?;
    if user.is_admin() {
        Ok(user)
    } else {
        Err(failure(StatusCode::FORBIDDEN, "Admin access required"))
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(state): Shared, Json(body): Json<Credentials>) -> Response {
    state.with_store(|store| {
        let Some(user) = store
            .users
            .iter()
            .find(|user| user.email == body.email && user.password == body.password)
            .cloned()
        else {
            return failure(StatusCode::BAD_REQUEST, "Invalid email or password");
        };
        let token = store.next_id("token");
        store.tokens.insert(token.clone(), user.id.clone());
        ok(json!({ "token": token, "user": user.identity() }))
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Registration {
    email: String,
    password: String,
    full_name: String,
    phone: Option<String>,
}

async fn register(State(state): Shared, Json(body): Json<Registration>) -> Response {
    state.with_store(|store| {
        if store.users.iter().any(|user| user.email == body.email) {
            return failure(StatusCode::CONFLICT, "Email is already registered");
        }
        let id = store.next_id("u");
        store.mail(&body.email, EmailToken::Verify(id.clone()));
        store.users.push(MockUser {
            id,
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            role: "customer",
            is_active: true,
            is_email_verified: false,
            phone: body.phone,
        });
        done()
    })
}

async fn refresh(State(state): Shared, headers: HeaderMap) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let token = store.next_id("token");
        store.tokens.insert(token.clone(), user.id);
        ok(json!({ "token": token }))
    })
}

async fn profile(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => ok(user.identity()),
        Err(response) => response,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileChanges {
    full_name: Option<String>,
    phone: Option<String>,
}

/// Names are stored trimmed, so an echoed identity can differ from the
/// request.
async fn update_profile(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<ProfileChanges>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let quiet = store.quiet_profile_updates;
        let Some(stored) = store.user_mut(&user.id) else {
            return failure(StatusCode::NOT_FOUND, "User not found");
        };
        if let Some(full_name) = body.full_name {
            stored.full_name = full_name.trim().to_string();
        }
        if let Some(phone) = body.phone {
            stored.phone = Some(phone);
        }
        if quiet { done() } else { ok(stored.identity()) }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<PasswordChange>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| match store.user_mut(&user.id) {
        Some(stored) if stored.password == body.current_password => {
            stored.password = body.new_password;
            done()
        }
        Some(_) => failure(StatusCode::BAD_REQUEST, "Current password is incorrect"),
        None => failure(StatusCode::NOT_FOUND, "User not found"),
    })
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

async fn verify_email(State(state): Shared, Json(body): Json<TokenBody>) -> Response {
    state.with_store(|store| {
        let Some(EmailToken::Verify(id)) = store.email_tokens.get(&body.token).cloned() else {
            return failure(StatusCode::BAD_REQUEST, "Invalid or expired token");
        };
        store.email_tokens.remove(&body.token);
        if let Some(user) = store.user_mut(&id) {
            user.is_email_verified = true;
        }
        done()
    })
}

#[derive(Deserialize)]
struct EmailBody {
    email: String,
}

/// Succeeds whether or not the email is registered.
async fn forgot_password(State(state): Shared, Json(body): Json<EmailBody>) -> Response {
    state.with_store(|store| {
        let id = store
            .users
            .iter()
            .find(|user| user.email == body.email)
            .map(|user| user.id.clone());
        if let Some(id) = id {
            store.mail(&body.email, EmailToken::Reset(id));
        }
        done()
    })
}

#[derive(Deserialize)]
struct PasswordReset {
    token: String,
    password: String,
}

async fn reset_password(State(state): Shared, Json(body): Json<PasswordReset>) -> Response {
    state.with_store(|store| {
        let Some(EmailToken::Reset(id)) = store.email_tokens.get(&body.token).cloned() else {
            return failure(StatusCode::BAD_REQUEST, "Invalid or expired token");
        };
        store.email_tokens.remove(&body.token);
        match store.user_mut(&id) {
            Some(user) => {
                user.password = body.password;
                done()
            }
            None => failure(StatusCode::NOT_FOUND, "User not found"),
        }
    })
}

// =============================================================================
// Addresses
// =============================================================================

async fn addresses(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => {
            state.with_store(|store| ok(store.addresses.get(&user.id).cloned().unwrap_or_default()))
        }
        Err(response) => response,
    }
}

/// The first address saved becomes the default; a new default demotes the old.
async fn create_address(
    State(state): Shared,
    headers: HeaderMap,
    Json(mut body): Json<Address>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let id = AddressId::new(store.next_id("addr"));
        let book = store.addresses.entry(user.id).or_default();
        body.id = Some(id);
        body.is_default = body.is_default || book.is_empty();
        if body.is_default {
            for address in book.iter_mut() {
                address.is_default = false;
            }
        }
        book.push(body.clone());
        ok(body)
    })
}

async fn update_address(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut body): Json<Address>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let id = AddressId::new(id);
    state.with_store(|store| {
        let book = store.addresses.entry(user.id).or_default();
        if !book.iter().any(|address| address.id.as_ref() == Some(&id)) {
            return failure(StatusCode::NOT_FOUND, "Address not found");
        }
        for address in book.iter_mut() {
            if address.id.as_ref() == Some(&id) {
                body.id = Some(id.clone());
                *address = body.clone();
            } else if body.is_default {
                address.is_default = false;
            }
        }
        done()
    })
}

async fn delete_address(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let id = AddressId::new(id);
    state.with_store(|store| {
        let book = store.addresses.entry(user.id).or_default();
        let Some(index) = book.iter().position(|address| address.id.as_ref() == Some(&id)) else {
            return failure(StatusCode::NOT_FOUND, "Address not found");
        };
        let removed = book.remove(index);
        if removed.is_default
            && let Some(first) = book.first_mut()
        {
            first.is_default = true;
        }
        done()
    })
}

// =============================================================================
// Catalog
// =============================================================================

async fn featured(State(state): Shared) -> Response {
    state.with_store(|store| ok(&store.products))
}

async fn product(State(state): Shared, Path(id): Path<String>) -> Response {
    state.with_store(|store| match store.product(&ProductId::new(id)) {
        Some(product) => ok(product),
        None => failure(StatusCode::NOT_FOUND, "Product not found"),
    })
}

async fn categories(State(state): Shared) -> Response {
    state.with_store(|store| ok(&store.categories))
}

async fn category(State(state): Shared, Path(id): Path<String>) -> Response {
    let id = CategoryId::new(id);
    state.with_store(|store| match store.categories.iter().find(|category| category.id == id) {
        Some(category) => ok(category),
        None => failure(StatusCode::NOT_FOUND, "Category not found"),
    })
}

async fn brands(State(state): Shared) -> Response {
    state.with_store(|store| ok(&store.brands))
}

// =============================================================================
// Reviews
// =============================================================================

/// Shoppers only see approved reviews.
async fn product_reviews(State(state): Shared, Path(id): Path<String>) -> Response {
    let id = ProductId::new(id);
    state.with_store(|store| {
        let reviews: Vec<&Review> = store
            .reviews
            .iter()
            .filter(|review| review.is_approved && review.product_id.as_ref() == Some(&id))
            .collect();
        ok(reviews)
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewBody {
    rating: u8,
    comment: String,
    order_id: String,
}

/// New reviews wait for moderation. The shopper must have placed the order
/// they cite.
async fn create_review(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if !(1..=5).contains(&body.rating) {
        return failure(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
    }
    let product_id = ProductId::new(id);
    state.with_store(|store| {
        let Some(product_name) = store.product(&product_id).map(|product| product.name.clone()) else {
            return failure(StatusCode::NOT_FOUND, "Product not found");
        };
        let ordered = store.orders.get(&user.id).is_some_and(|orders| {
            orders
                .iter()
                .any(|order| order.get("id").and_then(Value::as_str) == Some(body.order_id.as_str()))
        });
        if !ordered {
            return failure(StatusCode::BAD_REQUEST, "Order not found");
        }
        let review = Review {
            id: ReviewId::new(store.next_id("r")),
            product_id: Some(product_id.clone()),
            product_name: Some(product_name),
            user_id: Some(UserId::new(user.id.as_str())),
            user_name: user.full_name.clone(),
            rating: body.rating,
            comment: body.comment,
            is_approved: false,
            is_reported: false,
            report_count: 0,
            created_at: Some(Utc::now()),
        };
        store.reviews.push(review.clone());
        ok(review)
    })
}

#[derive(Deserialize)]
struct ReviewChanges {
    rating: Option<u8>,
    comment: Option<String>,
}

async fn update_review(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewChanges>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let id = ReviewId::new(id);
    state.with_store(|store| {
        let Some(review) = store.reviews.iter_mut().find(|review| review.id == id) else {
            return failure(StatusCode::NOT_FOUND, "Review not found");
        };
        if review.user_id.as_ref().map(UserId::as_str) != Some(user.id.as_str()) {
            return failure(StatusCode::FORBIDDEN, "You can only edit your own reviews");
        }
        if let Some(rating) = body.rating {
            review.rating = rating;
        }
        if let Some(comment) = body.comment {
            review.comment = comment;
        }
        let product = review.product_id.clone();
        if let Some(product) = product {
            store.restat(&product);
        }
        done()
    })
}

async fn delete_review(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let id = ReviewId::new(id);
    state.with_store(|store| {
        let Some(review) = store.reviews.iter().find(|review| review.id == id) else {
            return failure(StatusCode::NOT_FOUND, "Review not found");
        };
        if review.user_id.as_ref().map(UserId::as_str) != Some(user.id.as_str()) {
            return failure(StatusCode::FORBIDDEN, "You can only delete your own reviews");
        }
        remove_review(store, &id);
        done()
    })
}

fn remove_review(store: &mut Store, id: &ReviewId) {
    let Some(index) = store.reviews.iter().position(|review| &review.id == id) else {
        return;
    };
    let removed = store.reviews.remove(index);
    if let Some(product) = removed.product_id {
        store.restat(&product);
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponCheck {
    code: String,
    cart_total: Decimal,
}

/// A coupon that does not apply is still a 200 with `valid: false`.
async fn validate_coupon(State(state): Shared, Json(body): Json<CouponCheck>) -> Response {
    state.with_store(|store| {
        let Some(coupon) = store
            .coupons
            .iter()
            .find(|coupon| coupon.code.eq_ignore_ascii_case(body.code.trim()))
        else {
            return ok(rejected("Coupon not found"));
        };
        if !coupon.is_usable_at(Utc::now()) {
            return ok(rejected("Coupon is no longer valid"));
        }
        let discount = coupon.discount_for(body.cart_total);
        if discount.is_zero() {
            return ok(rejected("Minimum order amount not reached"));
        }
        ok(json!({ "valid": true, "discountAmount": discount }))
    })
}

fn rejected(message: &str) -> Value {
    json!({ "valid": false, "discountAmount": Decimal::ZERO, "message": message })
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItem {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Deserialize)]
struct Quantity {
    quantity: u32,
}

async fn cart(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => state.with_store(|store| ok(store.carts.get(&user.id).cloned().unwrap_or_default())),
        Err(response) => response,
    }
}

async fn add_cart_item(State(state): Shared, headers: HeaderMap, Json(body): Json<AddItem>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let Some(product) = store.product(&body.product_id).cloned() else {
            return failure(StatusCode::NOT_FOUND, "Product not found");
        };
        if body.quantity > product.stock_quantity {
            return failure(StatusCode::BAD_REQUEST, "Insufficient stock");
        }
        store.add_to_cart(&user.id, &product, body.quantity);
        done()
    })
}

async fn set_cart_item(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Quantity>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let line_id = CartLineId::new(id);
    state.with_store(|store| {
        let lines = store.carts.entry(user.id).or_default();
        match lines.iter_mut().find(|line| line.id == line_id) {
            Some(line) if body.quantity > line.product.stock_quantity => {
                failure(StatusCode::BAD_REQUEST, "Insufficient stock")
            }
            Some(line) => {
                line.quantity = body.quantity;
                done()
            }
            None => failure(StatusCode::NOT_FOUND, "Cart item not found"),
        }
    })
}

async fn remove_cart_item(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let line_id = CartLineId::new(id);
    state.with_store(|store| {
        let lines = store.carts.entry(user.id).or_default();
        let before = lines.len();
        lines.retain(|line| line.id != line_id);
        if lines.len() == before {
            failure(StatusCode::NOT_FOUND, "Cart item not found")
        } else {
            done()
        }
    })
}

async fn clear_cart(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => state.with_store(|store| {
            store.carts.remove(&user.id);
            done()
        }),
        Err(response) => response,
    }
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRef {
    product_id: ProductId,
}

async fn wishlist(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => {
            state.with_store(|store| ok(store.wishlists.get(&user.id).cloned().unwrap_or_default()))
        }
        Err(response) => response,
    }
}

async fn add_wishlist_item(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<ProductRef>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let Some(product) = store.product(&body.product_id).cloned() else {
            return failure(StatusCode::NOT_FOUND, "Product not found");
        };
        store.add_to_wishlist(&user.id, &product);
        done()
    })
}

async fn remove_wishlist_item(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let product_id = ProductId::new(id);
    state.with_store(|store| {
        store
            .wishlists
            .entry(user.id)
            .or_default()
            .retain(|entry| entry.product_id != product_id);
        done()
    })
}

// =============================================================================
// Notifications
// =============================================================================

async fn notifications(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => state.with_store(|store| {
            ok(store.notifications.get(&user.id).cloned().unwrap_or_default())
        }),
        Err(response) => response,
    }
}

async fn read_notification(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let id = NotificationId::new(id);
    state.with_store(|store| {
        let feed = store.notifications.entry(user.id).or_default();
        match feed.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.is_read = true;
                done()
            }
            None => failure(StatusCode::NOT_FOUND, "Notification not found"),
        }
    })
}

async fn read_all_notifications(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => state.with_store(|store| {
            for item in store.notifications.entry(user.id).or_default() {
                item.is_read = true;
            }
            done()
        }),
        Err(response) => response,
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest {
    items: Vec<AddItem>,
    shipping_address: Value,
    payment_method: String,
}

async fn orders(State(state): Shared, headers: HeaderMap) -> Response {
    match caller(&state, &headers) {
        Ok(user) => state.with_store(|store| ok(store.orders.get(&user.id).cloned().unwrap_or_default())),
        Err(response) => response,
    }
}

async fn create_order(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<OrderRequest>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if body.items.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Order has no items");
    }
    state.with_store(|store| {
        let mut items = Vec::new();
        let mut subtotal = Decimal::ZERO;
        for item in &body.items {
            let Some(product) = store.product(&item.product_id) else {
                return failure(StatusCode::BAD_REQUEST, "Unknown product in order");
            };
            let price = product.effective_price();
            subtotal += price * Decimal::from(item.quantity);
            items.push(json!({
                "id": product.id,
                "name": product.name,
                "quantity": item.quantity,
                "price": price,
            }));
        }
        let shipping = ShippingPolicy::default().quote(subtotal);
        let id = store.next_id("o");
        let order = json!({
            "id": id,
            "orderNumber": format!("BZ-{}", id.trim_start_matches("o-")),
            "status": "pending",
            "paymentStatus": "pending",
            "paymentMethod": body.payment_method,
            "subtotal": subtotal,
            "shipping": shipping,
            "total": subtotal + shipping,
            "items": items,
            "shippingAddress": body.shipping_address,
        });
        store.orders.entry(user.id).or_default().push(order.clone());
        ok(order)
    })
}

async fn order(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let found = store
            .orders
            .get(&user.id)
            .and_then(|orders| orders.iter().find(|order| has_str(order, "id", &id)));
        match found {
            Some(order) => ok(order),
            None => failure(StatusCode::NOT_FOUND, "Order not found"),
        }
    })
}

#[derive(Deserialize)]
struct CancelRequest {
    reason: Option<String>,
}

async fn cancel_order(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let Some(order) = store
            .orders
            .get_mut(&user.id)
            .and_then(|orders| orders.iter_mut().find(|order| has_str(order, "id", &id)))
        else {
            return failure(StatusCode::NOT_FOUND, "Order not found");
        };
        if !has_str(order, "status", "pending") {
            return failure(StatusCode::BAD_REQUEST, "Only pending orders can be cancelled");
        }
        if let Some(fields) = order.as_object_mut() {
            fields.insert("status".to_string(), json!(OrderStatus::Cancelled));
            fields.insert("cancelReason".to_string(), json!(body.reason));
        }
        done()
    })
}

async fn track_order(State(state): Shared, headers: HeaderMap, Path(number): Path<String>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state.with_store(|store| {
        let found = store
            .orders
            .get(&user.id)
            .and_then(|orders| orders.iter().find(|order| has_str(order, "trackingNumber", &number)));
        match found {
            Some(order) => ok(order),
            None => failure(StatusCode::NOT_FOUND, "No order with that tracking number"),
        }
    })
}

fn has_str(value: &Value, key: &str, expected: &str) -> bool {
    value.get(key).and_then(Value::as_str) == Some(expected)
}

// =============================================================================
// Admin
// =============================================================================

async fn admin_stats(State(state): Shared, headers: HeaderMap) -> Response {
    match admin(&state, &headers) {
        Ok(_) => state.with_store(|store| ok(store.stats())),
        Err(response) => response,
    }
}

async fn admin_users(State(state): Shared, headers: HeaderMap) -> Response {
    match admin(&state, &headers) {
        Ok(_) => state.with_store(|store| {
            let users: Vec<Value> = store.users.iter().map(MockUser::identity).collect();
            ok(users)
        }),
        Err(response) => response,
    }
}

async fn ban_user(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    set_active(&state, &headers, &id, false)
}

async fn unban_user(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    set_active(&state, &headers, &id, true)
}

fn set_active(state: &MockState, headers: &HeaderMap, id: &str, active: bool) -> Response {
    if let Err(response) = admin(state, headers) {
        return response;
    }
    state.with_store(|store| match store.user_mut(id) {
        Some(user) => {
            user.is_active = active;
            done()
        }
        None => failure(StatusCode::NOT_FOUND, "User not found"),
    })
}

// =============================================================================
// Admin catalog
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody {
    name: String,
    description: Option<String>,
    sku: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock_quantity: u32,
    category_id: Option<CategoryId>,
    brand_id: Option<BrandId>,
    status: ProductStatus,
    #[serde(default)]
    images: Vec<String>,
}

impl ProductBody {
    /// Copy the editable fields onto `product`, resolving category and brand
    /// ids to their names.
    fn apply(self, store: &Store, product: &mut Product) {
        product.name = self.name;
        product.description = self.description.unwrap_or_default();
        product.sku = Some(self.sku);
        product.price = self.price;
        product.sale_price = self.sale_price;
        product.stock_quantity = self.stock_quantity;
        product.status = self.status;
        product.images = self.images;
        if let Some(category) = self
            .category_id
            .and_then(|id| store.categories.iter().find(|category| category.id == id))
        {
            product.category.clone_from(&category.name);
        }
        if let Some(brand) = self
            .brand_id
            .and_then(|id| store.brands.iter().find(|brand| brand.id == id))
        {
            product.brand.clone_from(&brand.name);
        }
    }
}

async fn admin_create_product(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        if store
            .products
            .iter()
            .any(|product| product.sku.as_deref() == Some(body.sku.as_str()))
        {
            return failure(StatusCode::CONFLICT, "SKU is already in use");
        }
        let mut product = Product {
            id: ProductId::new(store.next_id("p")),
            name: String::new(),
            description: String::new(),
            sku: None,
            price: Decimal::ZERO,
            sale_price: None,
            images: Vec::new(),
            stock_quantity: 0,
            category: String::new(),
            brand: String::new(),
            rating: 0.0,
            review_count: 0,
            status: ProductStatus::Active,
            specifications: std::collections::BTreeMap::new(),
            created_at: Some(Utc::now()),
        };
        body.apply(store, &mut product);
        store.products.push(product.clone());
        ok(product)
    })
}

async fn admin_update_product(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ProductBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = ProductId::new(id);
    state.with_store(|store| {
        let Some(mut product) = store.product(&id).cloned() else {
            return failure(StatusCode::NOT_FOUND, "Product not found");
        };
        body.apply(store, &mut product);
        if let Some(stored) = store.products.iter_mut().find(|stored| stored.id == id) {
            *stored = product;
        }
        done()
    })
}

async fn admin_delete_product(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = ProductId::new(id);
    state.with_store(|store| {
        let before = store.products.len();
        store.products.retain(|product| product.id != id);
        if store.products.len() == before {
            failure(StatusCode::NOT_FOUND, "Product not found")
        } else {
            done()
        }
    })
}

async fn admin_set_stock(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Quantity>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = ProductId::new(id);
    state.with_store(|store| match store.products.iter_mut().find(|product| product.id == id) {
        Some(product) => {
            product.stock_quantity = body.quantity;
            done()
        }
        None => failure(StatusCode::NOT_FOUND, "Product not found"),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryBody {
    name: String,
    slug: String,
    description: Option<String>,
    parent_id: Option<CategoryId>,
    image_url: Option<String>,
}

impl CategoryBody {
    fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            image_url: self.image_url,
            parent_id: self.parent_id,
            children: Vec::new(),
            product_count: 0,
            is_active: true,
            created_at: Some(Utc::now()),
        }
    }
}

async fn admin_create_category(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<CategoryBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        if store.categories.iter().any(|category| category.slug == body.slug) {
            return failure(StatusCode::CONFLICT, "Slug is already in use");
        }
        let category = body.into_category(CategoryId::new(store.next_id("c")));
        store.categories.push(category.clone());
        ok(category)
    })
}

async fn admin_update_category(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CategoryBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = CategoryId::new(id);
    state.with_store(|store| match store.categories.iter_mut().find(|category| category.id == id) {
        Some(category) => {
            let product_count = category.product_count;
            *category = body.into_category(id);
            category.product_count = product_count;
            done()
        }
        None => failure(StatusCode::NOT_FOUND, "Category not found"),
    })
}

async fn admin_delete_category(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = CategoryId::new(id);
    state.with_store(|store| {
        let before = store.categories.len();
        store.categories.retain(|category| category.id != id);
        if store.categories.len() == before {
            failure(StatusCode::NOT_FOUND, "Category not found")
        } else {
            done()
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrandBody {
    name: String,
    slug: String,
    description: Option<String>,
    logo_url: Option<String>,
}

impl BrandBody {
    fn into_brand(self, id: BrandId) -> Brand {
        Brand {
            id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            logo_url: self.logo_url,
            product_count: 0,
            is_active: true,
            created_at: Some(Utc::now()),
        }
    }
}

async fn admin_create_brand(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<BrandBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        if store.brands.iter().any(|brand| brand.slug == body.slug) {
            return failure(StatusCode::CONFLICT, "Slug is already in use");
        }
        let brand = body.into_brand(BrandId::new(store.next_id("b")));
        store.brands.push(brand.clone());
        ok(brand)
    })
}

async fn admin_update_brand(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BrandBody>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = BrandId::new(id);
    state.with_store(|store| match store.brands.iter_mut().find(|brand| brand.id == id) {
        Some(brand) => {
            let product_count = brand.product_count;
            *brand = body.into_brand(id);
            brand.product_count = product_count;
            done()
        }
        None => failure(StatusCode::NOT_FOUND, "Brand not found"),
    })
}

async fn admin_delete_brand(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = BrandId::new(id);
    state.with_store(|store| {
        let before = store.brands.len();
        store.brands.retain(|brand| brand.id != id);
        if store.brands.len() == before {
            failure(StatusCode::NOT_FOUND, "Brand not found")
        } else {
            done()
        }
    })
}

// =============================================================================
// Admin coupons
// =============================================================================

async fn admin_coupons(State(state): Shared, headers: HeaderMap) -> Response {
    match admin(&state, &headers) {
        Ok(_) => state.with_store(|store| ok(&store.coupons)),
        Err(response) => response,
    }
}

/// Build a stored coupon from a request body, keeping server-owned fields.
fn coupon_from(body: Value, id: CouponId, used_count: u32) -> Result<Coupon, Response> {
    let mut fields = match body {
        Value::Object(fields) => fields,
        _ => return Err(failure(StatusCode::BAD_REQUEST, "Invalid coupon")),
    };
    fields.insert("id".to_string(), json!(id));
    fields.insert("usedCount".to_string(), json!(used_count));
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| failure(StatusCode::BAD_REQUEST, &format!("Invalid coupon: {e}")))
}

async fn admin_create_coupon(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        let id = CouponId::new(store.next_id("cp"));
        let mut coupon = match coupon_from(body, id, 0) {
            Ok(coupon) => coupon,
            Err(response) => return response,
        };
        if store.coupons.iter().any(|existing| existing.code == coupon.code) {
            return failure(StatusCode::CONFLICT, "Coupon code is already in use");
        }
        coupon.created_at = Some(Utc::now());
        store.coupons.push(coupon.clone());
        ok(coupon)
    })
}

async fn admin_update_coupon(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = CouponId::new(id);
    state.with_store(|store| {
        let Some(stored) = store.coupons.iter_mut().find(|coupon| coupon.id == id) else {
            return failure(StatusCode::NOT_FOUND, "Coupon not found");
        };
        match coupon_from(body, id, stored.used_count) {
            Ok(coupon) => {
                *stored = Coupon {
                    created_at: stored.created_at,
                    ..coupon
                };
                done()
            }
            Err(response) => response,
        }
    })
}

async fn admin_delete_coupon(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = CouponId::new(id);
    state.with_store(|store| {
        let before = store.coupons.len();
        store.coupons.retain(|coupon| coupon.id != id);
        if store.coupons.len() == before {
            failure(StatusCode::NOT_FOUND, "Coupon not found")
        } else {
            done()
        }
    })
}

// =============================================================================
// Admin reviews
// =============================================================================

#[derive(Deserialize)]
struct ReviewQuery {
    status: Option<String>,
}

async fn admin_reviews(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<ReviewQuery>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        let reviews: Vec<&Review> = store
            .reviews
            .iter()
            .filter(|review| match query.status.as_deref() {
                Some("pending") => !review.is_approved,
                Some("approved") => review.is_approved,
                Some("reported") => review.is_reported,
                _ => true,
            })
            .collect();
        ok(reviews)
    })
}

async fn approve_review(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    moderate(&state, &headers, &id, true)
}

async fn reject_review(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    moderate(&state, &headers, &id, false)
}

fn moderate(state: &MockState, headers: &HeaderMap, id: &str, approved: bool) -> Response {
    if let Err(response) = admin(state, headers) {
        return response;
    }
    let id = ReviewId::new(id);
    state.with_store(|store| {
        let Some(review) = store.reviews.iter_mut().find(|review| review.id == id) else {
            return failure(StatusCode::NOT_FOUND, "Review not found");
        };
        review.is_approved = approved;
        review.is_reported = false;
        let product = review.product_id.clone();
        if let Some(product) = product {
            store.restat(&product);
        }
        done()
    })
}

async fn admin_delete_review(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    let id = ReviewId::new(id);
    state.with_store(|store| {
        if !store.reviews.iter().any(|review| review.id == id) {
            return failure(StatusCode::NOT_FOUND, "Review not found");
        }
        remove_review(store, &id);
        done()
    })
}

// =============================================================================
// Admin orders, settings and reports
// =============================================================================

#[derive(Deserialize)]
struct StatusChange {
    status: OrderStatus,
    notes: Option<String>,
}

async fn admin_order_status(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusChange>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        let Some(fields) = store.order_mut(&id).and_then(Value::as_object_mut) else {
            return failure(StatusCode::NOT_FOUND, "Order not found");
        };
        fields.insert("status".to_string(), json!(body.status));
        if let Some(notes) = body.notes {
            fields.insert("adminNotes".to_string(), json!(notes));
        }
        done()
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingAssignment {
    tracking_number: String,
    carrier: String,
}

async fn admin_order_tracking(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TrackingAssignment>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    state.with_store(|store| {
        let Some(fields) = store.order_mut(&id).and_then(Value::as_object_mut) else {
            return failure(StatusCode::NOT_FOUND, "Order not found");
        };
        fields.insert("trackingNumber".to_string(), json!(body.tracking_number));
        fields.insert("carrier".to_string(), json!(body.carrier));
        done()
    })
}

async fn admin_settings(State(state): Shared, headers: HeaderMap) -> Response {
    match admin(&state, &headers) {
        Ok(_) => state.with_store(|store| ok(&store.settings)),
        Err(response) => response,
    }
}

async fn admin_update_settings(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    if !body.is_object() {
        return failure(StatusCode::BAD_REQUEST, "Settings must be an object");
    }
    state.with_store(|store| {
        store.settings = body;
        done()
    })
}

/// Only the `sales` report is modelled; it echoes the query it was given.
async fn admin_report(
    State(state): Shared,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = admin(&state, &headers) {
        return response;
    }
    if kind != "sales" {
        return failure(StatusCode::NOT_FOUND, "Unknown report");
    }
    state.with_store(|store| {
        let stats = store.stats();
        ok(json!({
            "kind": kind,
            "params": params,
            "totalOrders": stats.get("totalOrders"),
            "totalRevenue": stats.get("totalRevenue"),
        }))
    })
}
