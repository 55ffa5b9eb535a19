//! Review moderation.

use bazaar_core::ReviewId;
use bazaar_storefront::api::{NO_BODY, segment, with_query};
use bazaar_storefront::models::Review;
use tracing::instrument;

use super::AdminClient;
use crate::error::AdminError;
use crate::types::ReviewFilter;

const REVIEWS: &str = "/admin/reviews";

impl AdminClient {
    /// `GET /admin/reviews[?status=]`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self))]
    pub async fn reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, AdminError> {
        self.require_admin("moderate reviews")?;
        let pairs: Vec<(&str, &str)> = filter
            .as_query()
            .map(|status| ("status", status))
            .into_iter()
            .collect();
        Ok(self.api().get_list(&with_query(REVIEWS, &pairs)).await?)
    }

    /// `PUT /admin/reviews/{id}/approve`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn approve_review(&self, id: &ReviewId) -> Result<(), AdminError> {
        self.require_admin("moderate reviews")?;
        self.api()
            .put_unit(&format!("{REVIEWS}/{}/approve", segment(id)), NO_BODY)
            .await?;
        Ok(())
    }

    /// `PUT /admin/reviews/{id}/reject`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn reject_review(&self, id: &ReviewId) -> Result<(), AdminError> {
        self.require_admin("moderate reviews")?;
        self.api()
            .put_unit(&format!("{REVIEWS}/{}/reject", segment(id)), NO_BODY)
            .await?;
        Ok(())
    }

    /// `DELETE /admin/reviews/{id}`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(&self, id: &ReviewId) -> Result<(), AdminError> {
        self.require_admin("moderate reviews")?;
        self.api()
            .delete_unit(&format!("{REVIEWS}/{}", segment(id)))
            .await?;
        Ok(())
    }
}
