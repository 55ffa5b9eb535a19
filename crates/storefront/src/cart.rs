//! Shopping cart state.
//!
//! The server owns the cart. Every mutation is sent first and the whole cart
//! is re-fetched afterwards, so the local lines are always a server snapshot.

use std::sync::Arc;

use bazaar_core::{CartLineId, ProductId};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, segment};
use crate::error::ClientError;
use crate::models::{AddCartItem, CartLine, QuantityBody, cart_item_count, cart_total};
use crate::scoped::{KeyedLocks, ScopedCell, SessionBound};
use crate::session::{Owner, Session};

const CART: &str = "/cart";
const CART_ITEMS: &str = "/cart/items";
const CART_CLEAR: &str = "/cart/clear";

/// The signed-in shopper's cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    session: Session,
    lines: ScopedCell<Vec<CartLine>>,
    locks: KeyedLocks<ProductId>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.lines().len())
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            inner: Arc::new(CartInner {
                session: session.clone(),
                lines: ScopedCell::new(session),
                locks: KeyedLocks::default(),
            }),
        }
    }

    fn api(&self) -> &ApiClient {
        self.inner.session.api()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.lines.read(Clone::clone)
    }

    #[must_use]
    pub fn line_for(&self, product: &ProductId) -> Option<CartLine> {
        self.inner
            .lines
            .read(|lines| lines.iter().find(|line| &line.product_id == product).cloned())
    }

    /// Σ `(sale price ?? price) × quantity`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.inner.lines.read(|lines| cart_total(lines))
    }

    /// Σ quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.inner.lines.read(|lines| cart_item_count(lines))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lines.read(Vec::is_empty)
    }

    /// Whether the last re-fetch after a write failed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.inner.lines.is_stale()
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// `GET /cart`, replacing the local lines. Anonymous sessions get an
    /// empty cart without a request.
    ///
    /// # Errors
    ///
    /// Adapter errors; local lines keep their last good value.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let Some(owner) = self.inner.session.current_owner() else {
            return Ok(());
        };
        self.fetch_for(&owner).await
    }

    async fn fetch_for(&self, owner: &Owner) -> Result<(), ClientError> {
        let lines: Vec<CartLine> = self.api().get_list(CART).await?;
        self.inner.lines.replace_for(owner, lines);
        Ok(())
    }

    /// Re-fetch after a successful write. A failure here is reported as
    /// `Resync` and leaves the snapshot flagged stale.
    async fn resync(&self, owner: &Owner) -> Result<(), ClientError> {
        self.fetch_for(owner).await.map_err(|e| {
            warn!(error = %e, "Cart saved but re-fetch failed");
            self.inner.lines.mark_stale(owner);
            ClientError::Resync(Box::new(e))
        })
    }

    fn require_owner(&self, action: &'static str) -> Result<Owner, ClientError> {
        self.inner.session.require_owner(action)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of `product`. An existing line for the product is
    /// increased instead of duplicated.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous (the cart is unchanged),
    /// `InvalidInput` for a zero quantity, otherwise adapter errors.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn add_to_cart(&self, product: &ProductId, quantity: u32) -> Result<(), ClientError> {
        let owner = self.require_owner("add items to your cart")?;
        if quantity == 0 {
            return Err(ClientError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        let _guard = self.inner.locks.lock(product).await;

        if let Some(existing) = self.line_for(product) {
            let merged = existing.quantity.saturating_add(quantity);
            return self.set_quantity(&owner, &existing.id, merged).await;
        }

        self.api()
            .post_unit(
                CART_ITEMS,
                Some(&AddCartItem {
                    product_id: product,
                    quantity,
                }),
            )
            .await?;
        info!(quantity, "Added to cart");
        self.resync(&owner).await
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn update_quantity(&self, line: &CartLineId, quantity: u32) -> Result<(), ClientError> {
        let owner = self.require_owner("change your cart")?;
        let product = self.product_of(line);
        let _guard = match &product {
            Some(product) => Some(self.inner.locks.lock(product).await),
            None => None,
        };
        self.set_quantity(&owner, line, quantity).await
    }

    async fn set_quantity(
        &self,
        owner: &Owner,
        line: &CartLineId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        if quantity == 0 {
            return self.delete_line(owner, line).await;
        }
        self.api()
            .put_unit(
                &format!("{CART_ITEMS}/{}", segment(line)),
                Some(&QuantityBody { quantity }),
            )
            .await?;
        self.resync(owner).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn remove_from_cart(&self, line: &CartLineId) -> Result<(), ClientError> {
        let owner = self.require_owner("change your cart")?;
        let product = self.product_of(line);
        let _guard = match &product {
            Some(product) => Some(self.inner.locks.lock(product).await),
            None => None,
        };
        self.delete_line(&owner, line).await
    }

    async fn delete_line(&self, owner: &Owner, line: &CartLineId) -> Result<(), ClientError> {
        self.api()
            .delete_unit(&format!("{CART_ITEMS}/{}", segment(line)))
            .await?;
        info!("Removed from cart");
        self.resync(owner).await
    }

    /// `DELETE /cart/clear`, then empty the local lines without re-fetching.
    /// Does nothing for anonymous sessions.
    ///
    /// # Errors
    ///
    /// Adapter errors; the local lines are kept in that case.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ClientError> {
        let Some(owner) = self.inner.session.current_owner() else {
            return Ok(());
        };
        self.api().delete_unit(CART_CLEAR).await?;
        self.inner.lines.replace_for(&owner, Vec::new());
        info!("Cart cleared");
        Ok(())
    }

    fn product_of(&self, line: &CartLineId) -> Option<ProductId> {
        self.inner.lines.read(|lines| {
            lines
                .iter()
                .find(|l| &l.id == line)
                .map(|l| l.product_id.clone())
        })
    }
}

impl SessionBound for CartStore {
    const NAME: &'static str = "cart";

    async fn refresh(&self) -> Result<(), ClientError> {
        Self::refresh(self).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::credentials::MemoryCredentialStore;
    use crate::session::SignUpPolicy;

    fn anonymous_cart() -> CartStore {
        let api = ApiClient::new(
            &ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let session = Session::new(api, SignUpPolicy::default());
        session.sign_out();
        CartStore::new(&session)
    }

    #[tokio::test]
    async fn test_anonymous_add_fails_without_request() {
        let cart = anonymous_cart();
        let err = cart
            .add_to_cart(&ProductId::new("p-1"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated(_)));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_refresh_and_clear_are_noops() {
        let cart = anonymous_cart();
        cart.refresh().await.unwrap();
        cart.clear_cart().await.unwrap();
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }
}
