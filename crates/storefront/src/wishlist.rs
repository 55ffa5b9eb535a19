//! Wishlist state. A set of products keyed by product id.

use std::sync::Arc;

use bazaar_core::ProductId;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, segment};
use crate::error::ClientError;
use crate::models::{ProductRef, WishlistEntry};
use crate::scoped::{KeyedLocks, ScopedCell, SessionBound};
use crate::session::{Owner, Session};

const WISHLIST: &str = "/wishlist";
const WISHLIST_ITEMS: &str = "/wishlist/items";

#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    session: Session,
    entries: ScopedCell<Vec<WishlistEntry>>,
    locks: KeyedLocks<ProductId>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("entries", &self.total_items())
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            inner: Arc::new(WishlistInner {
                session: session.clone(),
                entries: ScopedCell::new(session),
                locks: KeyedLocks::default(),
            }),
        }
    }

    fn api(&self) -> &ApiClient {
        self.inner.session.api()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.inner.entries.read(Clone::clone)
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product: &ProductId) -> bool {
        self.inner
            .entries
            .read(|entries| entries.iter().any(|entry| &entry.product_id == product))
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.inner.entries.read(Vec::len)
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.inner.entries.is_stale()
    }

    /// `GET /wishlist`. Anonymous sessions stay empty without a request.
    ///
    /// # Errors
    ///
    /// Adapter errors; entries keep their last good value.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let Some(owner) = self.inner.session.current_owner() else {
            return Ok(());
        };
        self.fetch_for(&owner).await
    }

    async fn fetch_for(&self, owner: &Owner) -> Result<(), ClientError> {
        let entries: Vec<WishlistEntry> = self.api().get_list(WISHLIST).await?;
        self.inner.entries.replace_for(owner, entries);
        Ok(())
    }

    async fn resync(&self, owner: &Owner) -> Result<(), ClientError> {
        self.fetch_for(owner).await.map_err(|e| {
            warn!(error = %e, "Wishlist saved but re-fetch failed");
            self.inner.entries.mark_stale(owner);
            ClientError::Resync(Box::new(e))
        })
    }

    /// `POST /wishlist/items`, then re-fetch.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn add_to_wishlist(&self, product: &ProductId) -> Result<(), ClientError> {
        let owner = self.inner.session.require_owner("save items to your wishlist")?;
        let _guard = self.inner.locks.lock(product).await;
        self.add(&owner, product).await
    }

    /// `DELETE /wishlist/items/{productId}`, then re-fetch.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn remove_from_wishlist(&self, product: &ProductId) -> Result<(), ClientError> {
        let owner = self.inner.session.require_owner("change your wishlist")?;
        let _guard = self.inner.locks.lock(product).await;
        self.remove(&owner, product).await
    }

    /// Add when absent, remove when present. Returns whether the product is
    /// in the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn toggle(&self, product: &ProductId) -> Result<bool, ClientError> {
        let owner = self.inner.session.require_owner("save items to your wishlist")?;
        let _guard = self.inner.locks.lock(product).await;
        if self.is_in_wishlist(product) {
            self.remove(&owner, product).await?;
            Ok(false)
        } else {
            self.add(&owner, product).await?;
            Ok(true)
        }
    }

    async fn add(&self, owner: &Owner, product: &ProductId) -> Result<(), ClientError> {
        self.api()
            .post_unit(WISHLIST_ITEMS, Some(&ProductRef { product_id: product }))
            .await?;
        info!("Added to wishlist");
        self.resync(owner).await
    }

    async fn remove(&self, owner: &Owner, product: &ProductId) -> Result<(), ClientError> {
        self.api()
            .delete_unit(&format!("{WISHLIST_ITEMS}/{}", segment(product)))
            .await?;
        info!("Removed from wishlist");
        self.resync(owner).await
    }
}

impl SessionBound for WishlistStore {
    const NAME: &'static str = "wishlist";

    async fn refresh(&self) -> Result<(), ClientError> {
        Self::refresh(self).await
    }
}
