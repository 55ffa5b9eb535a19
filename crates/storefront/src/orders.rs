//! The signed-in shopper's orders.

use bazaar_core::OrderId;
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::{ApiClient, segment, with_query};
use crate::error::ClientError;
use crate::models::{NewOrder, Order, OrderQuery};
use crate::session::Session;

const ORDERS: &str = "/orders";

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Order history, placement and tracking. Every call needs a signed-in
/// shopper.
#[derive(Debug, Clone)]
pub struct OrderClient {
    session: Session,
}

impl OrderClient {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// `GET /orders`.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise adapter errors.
    #[instrument(skip(self))]
    pub async fn orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ClientError> {
        self.session.require_identity("view your orders")?;
        self.api().get_list(&with_query(ORDERS, &query.pairs())).await
    }

    /// `GET /orders/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `MissingData` when the API returns no order, or
    /// adapter errors.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ClientError> {
        self.session.require_identity("view your orders")?;
        self.api()
            .get_path(&format!("{ORDERS}/{}", segment(id)))
            .await?
            .ok_or(ClientError::MissingData("/orders/{id}"))
    }

    /// `POST /orders`.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `InvalidInput` for an order without items, or
    /// adapter errors.
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ClientError> {
        self.session.require_identity("place an order")?;
        if order.items.is_empty() {
            return Err(ClientError::InvalidInput(
                "an order needs at least one item".to_string(),
            ));
        }
        let created: Order = self
            .api()
            .post(ORDERS, order)
            .await?
            .ok_or(ClientError::MissingData("/orders"))?;
        info!(order_id = %created.id, order_number = %created.order_number, "Order placed");
        Ok(created)
    }

    /// `POST /orders/{id}/cancel`. Sent regardless of the cached status; the
    /// server decides.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` or adapter errors.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId, reason: Option<&str>) -> Result<(), ClientError> {
        self.session.require_identity("cancel an order")?;
        self.api()
            .post_unit(
                &format!("{ORDERS}/{}/cancel", segment(id)),
                Some(&CancelBody {
                    reason: reason.map(str::trim).filter(|r| !r.is_empty()),
                }),
            )
            .await?;
        info!("Order cancelled");
        Ok(())
    }

    /// `GET /orders/track/{trackingNumber}`.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `InvalidInput` for a blank number, `MissingData`
    /// or adapter errors.
    #[instrument(skip(self))]
    pub async fn track(&self, tracking_number: &str) -> Result<Order, ClientError> {
        self.session.require_identity("track an order")?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(ClientError::InvalidInput(
                "tracking number cannot be empty".to_string(),
            ));
        }
        self.api()
            .get_path(&format!("{ORDERS}/track/{}", segment(tracking_number)))
            .await?
            .ok_or(ClientError::MissingData("/orders/track/{trackingNumber}"))
    }
}
