//! Back-office client for the `/admin` endpoints.
//!
//! Each resource lives in its own file as an `impl AdminClient` block. Every
//! call checks locally that an admin is signed in before any request is made.

use bazaar_storefront::models::Identity;
use bazaar_storefront::{ApiClient, Session};

use crate::error::AdminError;

mod catalog;
mod coupons;
mod orders;
mod reviews;
mod settings;
mod users;

/// Admin operations over the shared [`ApiClient`].
#[derive(Debug, Clone)]
pub struct AdminClient {
    session: Session,
}

impl AdminClient {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// The signed-in admin.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, `NotAdmin` for any other role.
    pub fn require_admin(&self, action: &'static str) -> Result<Identity, AdminError> {
        let identity = self.session.require_identity(action)?;
        if identity.is_admin() {
            Ok(identity)
        } else {
            Err(AdminError::NotAdmin)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::UserId;
    use bazaar_storefront::{ClientConfig, ClientError, MemoryCredentialStore, SignUpPolicy};

    use super::*;

    #[tokio::test]
    async fn test_anonymous_calls_never_reach_the_network() {
        let api = ApiClient::new(
            &ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let session = Session::new(api, SignUpPolicy::default());
        session.sign_out();
        let admin = AdminClient::new(&session);

        assert!(matches!(
            admin.ban_user(&UserId::new("u-2"), None).await.unwrap_err(),
            AdminError::Client(ClientError::NotAuthenticated(_))
        ));
        assert!(matches!(
            admin.settings().await.unwrap_err(),
            AdminError::Client(ClientError::NotAuthenticated(_))
        ));
    }
}
