//! Store settings and reports.

use bazaar_storefront::api::{segment, with_query};
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::AdminError;
use crate::types::StoreSettings;

const SETTINGS: &str = "/admin/settings";

impl AdminClient {
    /// `GET /admin/settings`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self))]
    pub async fn settings(&self) -> Result<StoreSettings, AdminError> {
        self.require_admin("view settings")?;
        Ok(self
            .api()
            .get_path(SETTINGS)
            .await?
            .unwrap_or_default())
    }

    /// `PUT /admin/settings`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, a negative shipping amount, or adapter errors.
    #[instrument(skip(self, settings))]
    pub async fn update_settings(&self, settings: &StoreSettings) -> Result<(), AdminError> {
        self.require_admin("change settings")?;
        if settings.shipping_cost.is_sign_negative()
            || settings.free_shipping_threshold.is_sign_negative()
        {
            return Err(AdminError::invalid("shipping amounts cannot be negative"));
        }
        self.api().put_unit(SETTINGS, Some(settings)).await?;
        info!("Store settings updated");
        Ok(())
    }

    /// `GET /admin/reports/{kind}` with arbitrary parameters. Report shapes
    /// vary by kind, so the payload is returned as raw JSON.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self, params))]
    pub async fn report(
        &self,
        kind: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, AdminError> {
        self.require_admin("view reports")?;
        let path = with_query(&format!("/admin/reports/{}", segment(kind)), params);
        Ok(self
            .api()
            .get_path(&path)
            .await?
            .unwrap_or(serde_json::Value::Null))
    }
}
