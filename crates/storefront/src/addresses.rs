//! Saved shipping addresses under `/user/addresses`.

use bazaar_core::AddressId;
use tracing::instrument;

use crate::api::{ApiClient, segment};
use crate::error::ClientError;
use crate::models::Address;
use crate::session::Session;

const ADDRESSES: &str = "/user/addresses";

#[derive(Debug, Clone)]
pub struct AddressClient {
    session: Session,
}

impl AddressClient {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// # Errors
    ///
    /// `NotAuthenticated` or adapter errors.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>, ClientError> {
        self.session.require_identity("view your addresses")?;
        self.api().get_list(ADDRESSES).await
    }

    /// The address flagged default, else the first one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list`].
    pub async fn default_address(&self) -> Result<Option<Address>, ClientError> {
        let addresses = self.list().await?;
        let default = addresses.iter().position(|a| a.is_default).unwrap_or(0);
        Ok(addresses.into_iter().nth(default))
    }

    /// # Errors
    ///
    /// `NotAuthenticated` or adapter errors.
    #[instrument(skip(self, address))]
    pub async fn create(&self, address: &Address) -> Result<Option<Address>, ClientError> {
        self.session.require_identity("save an address")?;
        self.api().post(ADDRESSES, address).await
    }

    /// # Errors
    ///
    /// `NotAuthenticated` or adapter errors.
    #[instrument(skip(self, address), fields(address_id = %id))]
    pub async fn update(&self, id: &AddressId, address: &Address) -> Result<(), ClientError> {
        self.session.require_identity("edit an address")?;
        self.api()
            .put_unit(&format!("{ADDRESSES}/{}", segment(id)), Some(address))
            .await
    }

    /// # Errors
    ///
    /// `NotAuthenticated` or adapter errors.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete(&self, id: &AddressId) -> Result<(), ClientError> {
        self.session.require_identity("delete an address")?;
        self.api()
            .delete_unit(&format!("{ADDRESSES}/{}", segment(id)))
            .await
    }
}
