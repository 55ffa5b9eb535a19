//! Shared client state.
//!
//! [`AppState`] wires one [`ApiClient`] and one [`Session`] into every
//! container and resource client, so they all observe the same identity.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::addresses::AddressClient;
use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::catalog::CatalogClient;
use crate::checkout::{CheckoutSummary, CouponClient};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::ClientError;
use crate::models::{NewOrder, NewOrderItem, Order, ShippingAddress};
use crate::notifications::NotificationStore;
use crate::orders::OrderClient;
use crate::scoped::spawn_session_sync;
use crate::session::Session;
use crate::wishlist::WishlistStore;

/// Everything a front end needs, cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    session: Session,
    cart: CartStore,
    wishlist: WishlistStore,
    notifications: NotificationStore,
    catalog: CatalogClient,
    orders: OrderClient,
    addresses: AddressClient,
    coupons: CouponClient,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("api_base_url", &self.inner.config.api_base_url)
            .field("session", &self.inner.session.state())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state backed by the credential file named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let credentials = Arc::new(FileCredentialStore::new(&config.credential_path));
        Self::with_credentials(config, credentials)
    }

    /// Build state with an explicit credential store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_credentials(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config, credentials)?;
        let session = Session::new(api, config.sign_up_policy);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cart: CartStore::new(&session),
                wishlist: WishlistStore::new(&session),
                notifications: NotificationStore::new(&session),
                catalog: CatalogClient::new(&session, config.catalog_cache_ttl),
                orders: OrderClient::new(&session),
                addresses: AddressClient::new(&session),
                coupons: CouponClient::new(&session),
                session,
                config,
            }),
        })
    }

    /// Re-fetch the cart, wishlist and notifications every time someone signs
    /// in. Call once, from inside a tokio runtime.
    #[must_use]
    pub fn start_session_sync(&self) -> Vec<JoinHandle<()>> {
        let session = &self.inner.session;
        vec![
            spawn_session_sync(session, self.inner.cart.clone()),
            spawn_session_sync(session, self.inner.wishlist.clone()),
            spawn_session_sync(session, self.inner.notifications.clone()),
        ]
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        self.inner.session.api()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationStore {
        &self.inner.notifications
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderClient {
        &self.inner.orders
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressClient {
        &self.inner.addresses
    }

    #[must_use]
    pub fn coupons(&self) -> &CouponClient {
        &self.inner.coupons
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Summary for the current cart with an optional coupon discount.
    #[must_use]
    pub fn checkout_summary(&self, discount: rust_decimal::Decimal) -> CheckoutSummary {
        CheckoutSummary::compute(
            self.inner.cart.total_price(),
            &self.inner.config.shipping,
            discount,
        )
    }

    /// Place an order for everything in the cart, then clear the cart.
    ///
    /// The order is the result: once it is placed, a failure to clear the
    /// cart is logged and the cart is left for the next refresh.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `InvalidInput` for an empty cart, otherwise
    /// adapter errors from placing the order.
    #[instrument(skip(self, shipping_address))]
    pub async fn checkout(
        &self,
        shipping_address: ShippingAddress,
        payment_method: &str,
        coupon_code: Option<&str>,
    ) -> Result<Order, ClientError> {
        self.inner.session.require_identity("check out")?;

        let items: Vec<NewOrderItem> = self
            .inner
            .cart
            .lines()
            .into_iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        if items.is_empty() {
            return Err(ClientError::InvalidInput("your cart is empty".to_string()));
        }

        let order = NewOrder {
            items,
            shipping_address,
            billing_address: None,
            payment_method: payment_method.to_string(),
            coupon_code: coupon_code
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
        };
        let placed = self.inner.orders.create_order(&order).await?;

        if let Err(e) = self.inner.cart.clear_cart().await {
            warn!(error = %e, order_id = %placed.id, "Order placed but cart could not be cleared");
        } else {
            info!(order_id = %placed.id, "Checkout complete");
        }
        Ok(placed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    #[tokio::test]
    async fn test_anonymous_checkout_is_refused() {
        let state = AppState::with_credentials(
            ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        state.session().sign_out();

        let err = state
            .checkout(ShippingAddress::default(), "card", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated(_)));
    }

    #[test]
    fn test_empty_cart_summary() {
        let state = AppState::with_credentials(
            ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let summary = state.checkout_summary(rust_decimal::Decimal::ZERO);
        assert!(summary.total.is_zero());
        assert!(summary.has_free_shipping());
    }
}
