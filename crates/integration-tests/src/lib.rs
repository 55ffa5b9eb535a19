//! End-to-end tests for the Bazaar client crates.
//!
//! [`MockApi`] serves an in-memory copy of the REST API on a random local
//! port. Tests point an [`AppState`] at it, drive the client, and script
//! failures or delays per route to exercise retries, timeouts, rollbacks and
//! the 401 redirect.
//!
//! ```rust,ignore
//! let api = MockApi::start().await;
//! let shop = api.client();
//! shop.session().sign_in(SHOPPER_EMAIL, &secret(SHOPPER_PASSWORD)).await?;
//! api.fail_next(Method::GET, "/cart", StatusCode::BAD_GATEWAY, 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod routes;
mod store;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub use axum::http::{Method, StatusCode};
use bazaar_core::ProductId;
use bazaar_storefront::models::CartLine;
use bazaar_storefront::{
    AppState, ClientConfig, ClientError, CredentialStore, MemoryCredentialStore, RetryPolicy,
};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use store::MockUser;
use store::{Fault, Store};

pub const SHOPPER_EMAIL: &str = "ayse@example.com";
pub const SHOPPER_PASSWORD: &str = "correct-horse";
pub const OTHER_SHOPPER_EMAIL: &str = "mehmet@example.com";
pub const OTHER_SHOPPER_PASSWORD: &str = "battery-staple";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Seeded shopper id for [`SHOPPER_EMAIL`].
pub const SHOPPER_ID: &str = "u-1";
/// Seeded shopper id for [`OTHER_SHOPPER_EMAIL`].
pub const OTHER_SHOPPER_ID: &str = "u-2";

/// Seeded products: a 50 glass, an 80 coffee on sale for 55, and a 120 pot
/// with only three left.
pub const GLASS: &str = "p-1";
pub const COFFEE: &str = "p-2";
pub const POT: &str = "p-3";

/// Seeded coupon: ten percent off orders of 100 or more.
pub const WELCOME_COUPON: &str = "WELCOME10";
/// Seeded category and brand every seeded product belongs to.
pub const KITCHEN: &str = "c-1";
pub const HOUSE_BRAND: &str = "b-1";

const API_PREFIX: &str = "/api";

pub(crate) struct MockState {
    store: Mutex<Store>,
}

impl MockState {
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.store.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A running mock API. The server stops when this is dropped.
pub struct MockApi {
    base_url: String,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl std::fmt::Debug for MockApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockApi {
    /// Bind to a random port on 127.0.0.1 and start serving seeded data.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            store: Mutex::new(Store::seeded()),
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API listener");
        let addr = listener.local_addr().expect("mock API address");
        let app = routes::router(Arc::clone(&state));

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Mock API stopped");
            }
        });
        info!(%addr, "Mock API listening");

        Self {
            base_url: format!("http://{addr}{API_PREFIX}"),
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client settings tuned for tests: short timeout, two quick attempts
    /// for GET requests.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            http_timeout: Duration::from_millis(500),
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(10),
                multiplier: 2,
                max_delay: Duration::from_millis(50),
            },
            ..ClientConfig::for_base_url(&self.base_url)
        }
    }

    /// A fresh client with its own in-memory credential store.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> AppState {
        self.client_with(Arc::new(MemoryCredentialStore::new()))
    }

    /// A client sharing `credentials`, e.g. to simulate a restart.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client_with(&self, credentials: Arc<dyn CredentialStore>) -> AppState {
        AppState::with_credentials(self.config(), credentials).expect("build client state")
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Answer the next `times` requests to `method path` with `status`.
    pub fn fail_next(&self, method: Method, path: &str, status: StatusCode, times: usize) {
        self.state.with_store(|store| {
            store.faults.insert(
                (method, path.to_string()),
                Fault {
                    status,
                    remaining: times,
                },
            );
        });
    }

    /// Hold every request to `method path` for `delay` before answering.
    pub fn delay(&self, method: Method, path: &str, delay: Duration) {
        self.state
            .with_store(|store| store.delays.insert((method, path.to_string()), delay));
    }

    /// Requests received for `method path`, including failed ones.
    #[must_use]
    pub fn hits(&self, method: Method, path: &str) -> usize {
        self.state.with_store(|store| {
            store
                .hits
                .get(&(method, path.to_string()))
                .copied()
                .unwrap_or_default()
        })
    }

    /// Revoke every issued token, so the next authenticated call gets 401.
    pub fn expire_tokens(&self) {
        self.state.with_store(|store| store.tokens.clear());
    }

    /// Answer profile updates with an empty envelope instead of the user.
    pub fn quiet_profile_updates(&self) {
        self.state
            .with_store(|store| store.quiet_profile_updates = true);
    }

    // =========================================================================
    // Server-side views
    // =========================================================================

    /// The cart as the server holds it for `user_id`.
    #[must_use]
    pub fn server_cart(&self, user_id: &str) -> Vec<CartLine> {
        self.state
            .with_store(|store| store.carts.get(user_id).cloned().unwrap_or_default())
    }

    /// Put `quantity` of `product` into `user_id`'s cart behind the client's
    /// back.
    pub fn seed_cart(&self, user_id: &str, product: &str, quantity: u32) {
        self.state.with_store(|store| {
            if let Some(product) = store.product(&ProductId::new(product)).cloned() {
                store.add_to_cart(user_id, &product, quantity);
            }
        });
    }

    /// Number of orders the server holds for `user_id`.
    #[must_use]
    pub fn order_count(&self, user_id: &str) -> usize {
        self.state
            .with_store(|store| store.orders.get(user_id).map_or(0, Vec::len))
    }

    /// The most recent one-time token mailed to `email`.
    #[must_use]
    pub fn sent_token(&self, email: &str) -> Option<String> {
        self.state.with_store(|store| {
            store
                .outbox
                .iter()
                .rev()
                .find(|(recipient, _)| recipient == email)
                .map(|(_, token)| token.clone())
        })
    }

    /// Status of `order_id` as the server holds it.
    #[must_use]
    pub fn order_status(&self, order_id: &str) -> Option<String> {
        self.state.with_store(|store| {
            store
                .order_mut(order_id)
                .and_then(|order| order.get("status"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
    }

    /// Whether the server considers `user_id` active.
    #[must_use]
    pub fn is_active(&self, user_id: &str) -> bool {
        self.state.with_store(|store| {
            store
                .users
                .iter()
                .any(|user| user.id == user_id && user.is_active)
        })
    }
}

#[must_use]
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// Sign `client` in, turning any failure into a panic with context.
///
/// # Panics
///
/// Panics if the mock API rejects the credentials.
pub async fn sign_in(client: &AppState, email: &str, password: &str) {
    let result: Result<_, ClientError> = client.session().sign_in(email, &secret(password)).await;
    if let Err(e) = result {
        panic!("sign-in as {email} failed: {e}");
    }
}
