//! Coupon management.

use bazaar_core::CouponId;
use bazaar_storefront::api::segment;
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::AdminError;
use crate::types::{Coupon, CouponInput};

const COUPONS: &str = "/admin/coupons";

impl AdminClient {
    /// `GET /admin/coupons`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self))]
    pub async fn coupons(&self) -> Result<Vec<Coupon>, AdminError> {
        self.require_admin("manage coupons")?;
        Ok(self.api().get_list(COUPONS).await?)
    }

    /// `POST /admin/coupons`. The code is upper-cased before sending.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, invalid input, or adapter errors.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_coupon(&self, input: &CouponInput) -> Result<Option<Coupon>, AdminError> {
        self.require_admin("manage coupons")?;
        let input = normalized(input)?;
        let created = self.api().post(COUPONS, &input).await?;
        info!("Coupon created");
        Ok(created)
    }

    /// `PUT /admin/coupons/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, invalid input, or adapter errors.
    #[instrument(skip(self, input), fields(coupon_id = %id))]
    pub async fn update_coupon(&self, id: &CouponId, input: &CouponInput) -> Result<(), AdminError> {
        self.require_admin("manage coupons")?;
        let input = normalized(input)?;
        self.api()
            .put_unit(&format!("{COUPONS}/{}", segment(id)), Some(&input))
            .await?;
        Ok(())
    }

    /// `DELETE /admin/coupons/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: &CouponId) -> Result<(), AdminError> {
        self.require_admin("manage coupons")?;
        self.api()
            .delete_unit(&format!("{COUPONS}/{}", segment(id)))
            .await?;
        Ok(())
    }
}

fn normalized(input: &CouponInput) -> Result<CouponInput, AdminError> {
    input.validate().map_err(AdminError::invalid)?;
    let mut input = input.clone();
    input.code = input.code.trim().to_uppercase();
    Ok(input)
}
