//! Dashboard statistics for admins.

use std::sync::Arc;

use bazaar_storefront::scoped::{ScopedCell, SessionBound};
use bazaar_storefront::{ClientError, Session};
use tracing::{debug, instrument};

use crate::error::AdminError;
use crate::types::AdminStats;

const DASHBOARD_STATS: &str = "/admin/dashboard/stats";

/// The latest [`AdminStats`] snapshot, visible only to admins.
#[derive(Clone)]
pub struct AdminStatsStore {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    session: Session,
    snapshot: ScopedCell<Option<AdminStats>>,
}

impl std::fmt::Debug for AdminStatsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminStatsStore")
            .field("loaded", &self.stats().is_some())
            .finish_non_exhaustive()
    }
}

impl AdminStatsStore {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            inner: Arc::new(StatsInner {
                session: session.clone(),
                snapshot: ScopedCell::new(session),
            }),
        }
    }

    fn current_is_admin(&self) -> bool {
        self.inner
            .session
            .current_identity()
            .is_some_and(|identity| identity.is_admin())
    }

    /// The current snapshot; `None` unless an admin is signed in and stats
    /// have been fetched.
    #[must_use]
    pub fn stats(&self) -> Option<AdminStats> {
        if !self.current_is_admin() {
            return None;
        }
        self.inner.snapshot.read(Clone::clone)
    }

    /// `GET /admin/dashboard/stats`, replacing the snapshot.
    ///
    /// # Errors
    ///
    /// `NotAdmin` (after clearing the snapshot) when the current identity is
    /// not an admin, `NotAuthenticated` when anonymous, otherwise adapter
    /// errors with the previous snapshot kept.
    #[instrument(skip(self))]
    pub async fn refresh_stats(&self) -> Result<AdminStats, AdminError> {
        let owner = self.inner.session.require_owner("view statistics")?;
        if !self.current_is_admin() {
            self.inner.snapshot.write(|snapshot| *snapshot = None);
            return Err(AdminError::NotAdmin);
        }

        let stats: AdminStats = self.inner.session.api().get(DASHBOARD_STATS).await?;
        debug!(
            total_orders = stats.total_orders,
            pending_orders = stats.pending_orders,
            "Fetched dashboard stats"
        );
        self.inner
            .snapshot
            .replace_for(&owner, Some(stats.clone()));
        Ok(stats)
    }
}

impl SessionBound for AdminStatsStore {
    const NAME: &'static str = "admin_stats";

    /// Non-admins are skipped quietly.
    async fn refresh(&self) -> Result<(), ClientError> {
        if !self.current_is_admin() {
            return Ok(());
        }
        match self.refresh_stats().await {
            Ok(_) | Err(AdminError::NotAdmin) => Ok(()),
            Err(AdminError::Client(e)) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_storefront::{ApiClient, ClientConfig, MemoryCredentialStore, SignUpPolicy};

    use super::*;

    #[tokio::test]
    async fn test_anonymous_has_no_stats() {
        let api = ApiClient::new(
            &ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let session = Session::new(api, SignUpPolicy::default());
        session.sign_out();
        let store = AdminStatsStore::new(&session);

        assert!(store.stats().is_none());
        assert!(matches!(
            store.refresh_stats().await.unwrap_err(),
            AdminError::Client(ClientError::NotAuthenticated(_))
        ));
        SessionBound::refresh(&store).await.unwrap();
    }
}
