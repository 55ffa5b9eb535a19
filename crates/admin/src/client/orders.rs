//! Order fulfilment.

use bazaar_core::{OrderId, OrderStatus};
use bazaar_storefront::api::segment;
use serde::Serialize;
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::AdminError;

const ORDERS: &str = "/admin/orders";

#[derive(Serialize)]
struct StatusBody<'a> {
    status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackingBody<'a> {
    tracking_number: &'a str,
    carrier: &'a str,
}

impl AdminClient {
    /// `PUT /admin/orders/{id}/status`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self, notes), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        notes: Option<&str>,
    ) -> Result<(), AdminError> {
        self.require_admin("update orders")?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        self.api()
            .put_unit(
                &format!("{ORDERS}/{}/status", segment(id)),
                Some(&StatusBody { status, notes }),
            )
            .await?;
        info!("Order status updated");
        Ok(())
    }

    /// `PUT /admin/orders/{id}/tracking`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, a blank number or carrier, or adapter errors.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn assign_tracking_number(
        &self,
        id: &OrderId,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<(), AdminError> {
        self.require_admin("update orders")?;
        let (tracking_number, carrier) = (tracking_number.trim(), carrier.trim());
        if tracking_number.is_empty() || carrier.is_empty() {
            return Err(AdminError::invalid("tracking number and carrier are required"));
        }
        self.api()
            .put_unit(
                &format!("{ORDERS}/{}/tracking", segment(id)),
                Some(&TrackingBody {
                    tracking_number,
                    carrier,
                }),
            )
            .await?;
        info!("Tracking number assigned");
        Ok(())
    }
}
