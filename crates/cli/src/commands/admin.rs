//! Back-office commands.

use bazaar_admin::{AdminClient, AdminStatsStore, ReviewFilter, UserQuery};
use bazaar_core::{OrderId, OrderStatus, UserId, UserRole};
use bazaar_storefront::AppState;

use super::emit;
use crate::render;

/// Admin client and stats store bound to the CLI session.
pub struct Console {
    client: AdminClient,
    stats: AdminStatsStore,
}

impl Console {
    pub fn new(state: &AppState) -> Self {
        Self {
            client: AdminClient::new(state.session()),
            stats: AdminStatsStore::new(state.session()),
        }
    }

    pub async fn stats(&self) -> Result<(), Box<dyn std::error::Error>> {
        let stats = self.stats.refresh_stats().await?;
        emit(&render::stats(&stats));
        Ok(())
    }

    pub async fn users(
        &self,
        search: Option<String>,
        role: Option<UserRole>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let query = UserQuery {
            search,
            role,
            ..UserQuery::default()
        };
        let text: String = self
            .client
            .users(&query)
            .await?
            .iter()
            .map(|user| render::user_row(user) + "\n")
            .collect();
        emit(&text);
        Ok(())
    }

    pub async fn user_role(&self, id: String, role: UserRole) -> Result<(), Box<dyn std::error::Error>> {
        self.client.update_user_role(&UserId::new(id), role).await?;
        emit(&format!("Role set to {role}."));
        Ok(())
    }

    pub async fn ban(&self, id: String, reason: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
        self.client.ban_user(&UserId::new(id), reason).await?;
        emit("User banned.");
        Ok(())
    }

    pub async fn unban(&self, id: String) -> Result<(), Box<dyn std::error::Error>> {
        self.client.unban_user(&UserId::new(id)).await?;
        emit("User unbanned.");
        Ok(())
    }

    pub async fn order_status(
        &self,
        id: String,
        status: OrderStatus,
        notes: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.client
            .update_order_status(&OrderId::new(id), status, notes)
            .await?;
        emit(&format!("Order moved to {status}."));
        Ok(())
    }

    pub async fn settings(&self) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.client.settings().await?;
        emit(&serde_json::to_string_pretty(&settings)?);
        Ok(())
    }

    pub async fn coupons(&self) -> Result<(), Box<dyn std::error::Error>> {
        let text: String = self
            .client
            .coupons()
            .await?
            .iter()
            .map(|coupon| render::coupon_row(coupon) + "\n")
            .collect();
        emit(&text);
        Ok(())
    }

    pub async fn reviews(&self, filter: ReviewFilter) -> Result<(), Box<dyn std::error::Error>> {
        let reviews = self.client.reviews(filter).await?;
        if reviews.is_empty() {
            emit("Nothing to moderate.");
            return Ok(());
        }
        let text: String = reviews
            .iter()
            .map(|review| render::review_row(review) + "\n")
            .collect();
        emit(&text);
        Ok(())
    }
}
