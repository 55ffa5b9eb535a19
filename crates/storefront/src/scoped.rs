//! Owner-scoped snapshots and per-key mutation locks.
//!
//! Every shopper collection is tagged with the session generation it was
//! filled under. Reads and writes compare that tag with the session's current
//! generation and reset the collection when they differ, so a sign-out clears
//! everything before the next read without any container having to be told.
//! Signing back in as the same user starts a new generation, so nothing from
//! the earlier sign-in survives.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::session::{Owner, Session};

#[derive(Debug)]
struct Scoped<T> {
    generation: u64,
    value: T,
    stale: bool,
}

impl<T: Default> Scoped<T> {
    fn empty(generation: u64) -> Self {
        Self {
            generation,
            value: T::default(),
            stale: false,
        }
    }
}

/// A value that belongs to the session generation it was touched under.
#[derive(Debug)]
pub struct ScopedCell<T> {
    session: Session,
    cell: RwLock<Scoped<T>>,
}

impl<T: Default> ScopedCell<T> {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            cell: RwLock::new(Scoped::empty(session.generation())),
        }
    }

    /// Read the value for the current generation.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let generation = self.session.generation();
        {
            let guard = self.cell.read().unwrap_or_else(PoisonError::into_inner);
            if guard.generation == generation {
                return f(&guard.value);
            }
        }
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        reset_if_foreign(&mut guard, generation);
        f(&guard.value)
    }

    /// Mutate the value for the current generation.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let generation = self.session.generation();
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        reset_if_foreign(&mut guard, generation);
        f(&mut guard.value)
    }

    /// Replace the value with data fetched for `owner`.
    ///
    /// Returns `false` and drops `value` when the session moved on while the
    /// fetch was in flight.
    pub fn replace_for(&self, owner: &Owner, value: T) -> bool {
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        if self.session.generation() != owner.generation {
            debug!(user_id = %owner.user_id, "Discarding fetched data for a previous sign-in");
            return false;
        }
        *guard = Scoped {
            generation: owner.generation,
            value,
            stale: false,
        };
        true
    }

    /// Mutate the value only if it still belongs to `owner`.
    pub fn write_for<R>(&self, owner: &Owner, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        if self.session.generation() != owner.generation {
            return None;
        }
        reset_if_foreign(&mut guard, owner.generation);
        Some(f(&mut guard.value))
    }

    /// Flag the value as out of date, if it still belongs to `owner`.
    pub fn mark_stale(&self, owner: &Owner) {
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        if self.session.generation() != owner.generation {
            return;
        }
        reset_if_foreign(&mut guard, owner.generation);
        guard.stale = true;
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        let generation = self.session.generation();
        let guard = self.cell.read().unwrap_or_else(PoisonError::into_inner);
        guard.generation == generation && guard.stale
    }
}

fn reset_if_foreign<T: Default>(scoped: &mut Scoped<T>, generation: u64) {
    if scoped.generation != generation {
        *scoped = Scoped::empty(generation);
    }
}

// =============================================================================
// KeyedLocks
// =============================================================================

/// Async mutexes keyed by value, e.g. one per product.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Wait for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop idle entries so the map does not grow with every product touched.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

// =============================================================================
// Session sync
// =============================================================================

/// A container that re-fetches its collection when someone signs in.
pub trait SessionBound: Clone + Send + Sync + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    /// Re-fetch from the API for the current identity.
    fn refresh(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Refresh `store` on every new sign-in, including a sign-out and sign-in of
/// the same user that the channel coalesced into one change. The task runs
/// until its handle is aborted or the runtime shuts down.
pub fn spawn_session_sync<S: SessionBound>(session: &Session, store: S) -> JoinHandle<()> {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        let mut last_owner = rx.borrow_and_update().owner();
        if last_owner.is_some() {
            sync_once(&store).await;
        }
        while rx.changed().await.is_ok() {
            let owner = rx.borrow_and_update().owner();
            if owner.is_some() && owner != last_owner {
                sync_once(&store).await;
            }
            last_owner = owner;
        }
    })
}

async fn sync_once<S: SessionBound>(store: &S) {
    match store.refresh().await {
        Ok(()) => debug!(container = S::NAME, "Synced after sign-in"),
        Err(e) => warn!(container = S::NAME, error = %e, "Sync after sign-in failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::ClientConfig;
    use crate::credentials::MemoryCredentialStore;
    use crate::models::Identity;
    use crate::session::SignUpPolicy;

    fn session() -> Session {
        let api = ApiClient::new(
            &ClientConfig::for_base_url("http://127.0.0.1:9/api"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        Session::new(api, SignUpPolicy::default())
    }

    fn sign_in_locally(session: &Session, id: &str) {
        let identity: Identity = serde_json::from_value(serde_json::json!({
            "id": id,
            "email": "ayse@example.com",
        }))
        .unwrap();
        session.set_identity(identity);
    }

    #[derive(Clone, Default)]
    struct CountingStore {
        refreshes: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl SessionBound for CountingStore {
        const NAME: &'static str = "counting";

        async fn refresh(&self) -> Result<(), ClientError> {
            self.refreshes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_anonymous_scope_holds_values_until_transition() {
        let session = session();
        let cell: ScopedCell<Vec<u32>> = ScopedCell::new(&session);

        cell.write(|v| v.push(1));
        assert_eq!(cell.read(Clone::clone), vec![1]);

        // Loading -> Anonymous keeps the owner (None) unchanged.
        session.sign_out();
        assert_eq!(cell.read(Vec::len), 1);
    }

    #[test]
    fn test_replace_for_other_owner_is_discarded() {
        let session = session();
        let cell: ScopedCell<Vec<u32>> = ScopedCell::new(&session);
        let gone = Owner {
            user_id: bazaar_core::UserId::new("u-1"),
            generation: session.generation() + 1,
        };

        assert!(!cell.replace_for(&gone, vec![1, 2, 3]));
        assert!(cell.read(Vec::is_empty));
        assert!(cell.write_for(&gone, |v| v.push(9)).is_none());
    }

    #[test]
    fn test_stale_flag() {
        let session = session();
        sign_in_locally(&session, "u-1");
        let owner = session.current_owner().unwrap();
        let cell: ScopedCell<Vec<u32>> = ScopedCell::new(&session);

        assert!(!cell.is_stale());
        cell.mark_stale(&owner);
        assert!(cell.is_stale());

        session.sign_out();
        assert!(!cell.is_stale());
    }

    #[test]
    fn test_same_user_signing_back_in_starts_empty() {
        let session = session();
        let cell: ScopedCell<Vec<u32>> = ScopedCell::new(&session);

        sign_in_locally(&session, "u-1");
        let first = session.current_owner().unwrap();
        assert!(cell.replace_for(&first, vec![1, 2]));

        // Nothing reads the cell between the two transitions.
        session.sign_out();
        sign_in_locally(&session, "u-1");

        assert!(cell.read(Vec::is_empty));
        assert!(!cell.replace_for(&first, vec![7]));
        assert!(cell.read(Vec::is_empty));
    }

    async fn wait_for_refreshes(store: &CountingStore, count: usize) -> bool {
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while store.refreshes.load(std::sync::atomic::Ordering::SeqCst) < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_sync_sees_coalesced_sign_out_and_sign_in() {
        let session = session();
        let store = CountingStore::default();
        sign_in_locally(&session, "u-1");
        let task = spawn_session_sync(&session, store.clone());
        assert!(wait_for_refreshes(&store, 1).await);

        // Both transitions land before the task runs again.
        session.sign_out();
        sign_in_locally(&session, "u-1");

        let synced = wait_for_refreshes(&store, 2).await;
        task.abort();
        assert!(synced);
    }

    #[tokio::test]
    async fn test_keyed_locks_serialize_same_key() {
        let locks: Arc<KeyedLocks<String>> = Arc::new(KeyedLocks::default());
        let guard = locks.lock(&"p-1".to_string()).await;

        // A different key is not blocked.
        let other = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock(&"p-2".to_string()),
        )
        .await;
        assert!(other.is_ok());

        // The same key waits until the guard is dropped.
        let same = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock(&"p-1".to_string()),
        )
        .await;
        assert!(same.is_err());

        drop(guard);
        let again = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock(&"p-1".to_string()),
        )
        .await;
        assert!(again.is_ok());
    }
}
