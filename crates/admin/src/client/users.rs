//! User administration.

use bazaar_core::{UserId, UserRole};
use bazaar_storefront::api::{NO_BODY, segment, with_query};
use serde::Serialize;
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::AdminError;
use crate::types::{ManagedUser, UserQuery};

const USERS: &str = "/admin/users";

#[derive(Serialize)]
struct RoleBody {
    role: UserRole,
}

#[derive(Serialize)]
struct BanBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl AdminClient {
    /// `GET /admin/users`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self))]
    pub async fn users(&self, query: &UserQuery) -> Result<Vec<ManagedUser>, AdminError> {
        self.require_admin("manage users")?;
        Ok(self
            .api()
            .get_list(&with_query(USERS, &query.pairs()))
            .await?)
    }

    /// `PUT /admin/users/{id}/role`. An admin cannot change their own role.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, invalid input, or adapter errors.
    #[instrument(skip(self), fields(user_id = %id, role = %role))]
    pub async fn update_user_role(&self, id: &UserId, role: UserRole) -> Result<(), AdminError> {
        let admin = self.require_admin("manage users")?;
        if &admin.id == id {
            return Err(AdminError::invalid("you cannot change your own role"));
        }
        self.api()
            .put_unit(&format!("{USERS}/{}/role", segment(id)), Some(&RoleBody { role }))
            .await?;
        info!("User role updated");
        Ok(())
    }

    /// `POST /admin/users/{id}/ban`.
    ///
    /// # Errors
    ///
    /// `NotAdmin`, an attempt to ban yourself, or adapter errors.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn ban_user(&self, id: &UserId, reason: Option<&str>) -> Result<(), AdminError> {
        let admin = self.require_admin("manage users")?;
        if &admin.id == id {
            return Err(AdminError::invalid("you cannot ban yourself"));
        }
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        self.api()
            .post_unit(&format!("{USERS}/{}/ban", segment(id)), Some(&BanBody { reason }))
            .await?;
        info!("User banned");
        Ok(())
    }

    /// `POST /admin/users/{id}/unban`.
    ///
    /// # Errors
    ///
    /// `NotAdmin` or adapter errors.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn unban_user(&self, id: &UserId) -> Result<(), AdminError> {
        self.require_admin("manage users")?;
        self.api()
            .post_unit(&format!("{USERS}/{}/unban", segment(id)), NO_BODY)
            .await?;
        info!("User unbanned");
        Ok(())
    }
}
