//! HTTP adapter for the Bazaar REST API.
//!
//! Every container funnels its calls through [`ApiClient::send`], which
//! attaches the bearer credential, unwraps the response envelope and turns
//! failures into [`ClientError`]s. A 401 from any endpoint removes the stored
//! credential and broadcasts [`Redirect::SignIn`].

mod retry;

pub use retry::RetryPolicy;

use std::sync::{Arc, PoisonError, RwLock};

use bazaar_core::{BearerToken, Email, Envelope};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::ClientError;
use crate::models::{Identity, LoginBody, LoginResponse};

/// Body argument for requests that send none.
pub const NO_BODY: Option<&()> = None;

/// Navigation requests the adapter raises for whatever front end is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// The credential was rejected; the user has to sign in again.
    SignIn,
}

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Bazaar REST API.
///
/// Cheap to clone; all clones share the HTTP connection pool, the credential
/// store and the redirect channel.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    retry: RetryPolicy,
    redirects: broadcast::Sender<Redirect>,
    unauthorized_hooks: RwLock<Vec<UnauthorizedHook>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `config.api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        url::Url::parse(&config.api_base_url)
            .map_err(|e| ClientError::InvalidInput(format!("API base URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("bazaar/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let (redirects, _) = broadcast::channel(16);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.trim_end_matches('/').to_string(),
                credentials,
                retry: config.retry,
                redirects,
                unauthorized_hooks: RwLock::new(Vec::new()),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    /// The stored credential, if any. Storage errors count as "none".
    #[must_use]
    pub fn credential(&self) -> Option<BearerToken> {
        match self.inner.credentials.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not read stored credential");
                None
            }
        }
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// Remove the stored credential, logging rather than failing.
    pub fn forget_credential(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "failed to remove stored credential");
        }
    }

    /// Subscribe to navigation requests such as [`Redirect::SignIn`].
    #[must_use]
    pub fn subscribe_redirects(&self) -> broadcast::Receiver<Redirect> {
        self.inner.redirects.subscribe()
    }

    /// Run `hook` whenever any request comes back 401, after the credential
    /// has been removed.
    pub fn on_unauthorized(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner
            .unauthorized_hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Absolute URL for an endpoint path such as `/cart/items`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the result is not a valid URL.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<url::Url, ClientError> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.inner.base_url)
        } else {
            format!("{}/{endpoint}", self.inner.base_url)
        };
        url::Url::parse(&joined).map_err(|e| ClientError::InvalidInput(format!("{endpoint}: {e}")))
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request and return the decoded envelope.
    ///
    /// GET requests are retried per the configured [`RetryPolicy`] on
    /// transport errors, timeouts and 5xx responses; other methods are sent
    /// exactly once.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` on 401 (the credential is removed first)
    /// - `Rejected` on any other non-2xx status or a `success: false` body
    /// - `Timeout` / `Http` on transport failures
    /// - `Decode` if the body is not a valid envelope of `T`
    #[instrument(skip_all, fields(method = %method, endpoint = %endpoint))]
    pub async fn send<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;
        let retry = if method == Method::GET {
            self.inner.retry
        } else {
            RetryPolicy::none()
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&method, &url, body).await {
                Ok(envelope) => return Ok(envelope),
                Err(err) if err.is_retryable() && retry.allows_another(attempt) => {
                    let delay = retry.delay_after(attempt);
                    warn!(attempt, ?delay, error = %err, "Retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<T, B>(
        &self,
        method: &Method,
        url: &url::Url,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(token) = self.credential() {
            request = request.header(AUTHORIZATION, token.authorization_header());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("API returned 401, dropping credential");
            self.handle_unauthorized();
            return Err(ClientError::Unauthorized);
        }

        let text = response.text().await?;

        if !status.is_success() {
            let err = rejection(status, &text);
            if status.is_server_error() {
                error!(status = status.as_u16(), error = %err, "API server error");
            } else {
                debug!(status = status.as_u16(), error = %err, "API rejected request");
            }
            return Err(err);
        }

        let envelope: Envelope<T> = if text.trim().is_empty() {
            Envelope {
                success: true,
                data: None,
                message: None,
                errors: Vec::new(),
            }
        } else {
            serde_json::from_str(&text).map_err(|source| {
                error!(
                    error = %source,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                ClientError::Decode {
                    endpoint: url.path().to_string(),
                    source,
                }
            })?
        };

        if !envelope.success {
            let message = envelope.failure_message("Request failed");
            debug!(status = status.as_u16(), %message, "API reported failure");
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
                errors: envelope.errors,
            });
        }

        debug!(status = status.as_u16(), "Request completed");
        Ok(envelope)
    }

    fn handle_unauthorized(&self) {
        self.forget_credential();
        // No subscribers is fine: nothing is listening for navigation.
        let _ = self.inner.redirects.send(Redirect::SignIn);

        let hooks = self
            .inner
            .unauthorized_hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook();
        }
    }

    /// GET an endpoint whose `data` is required.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`], plus `MissingData` when `data` is absent.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ClientError> {
        self.get_path(endpoint).await?.ok_or(ClientError::MissingData(endpoint))
    }

    /// GET a dynamic path; `data` may be absent.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn get_path<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        Ok(self.send::<T, ()>(Method::GET, path, NO_BODY).await?.data)
    }

    /// GET a collection; a missing `data` means empty.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ClientError> {
        Ok(self.get_path::<Vec<T>>(path).await?.unwrap_or_default())
    }

    /// POST and return `data`, which may be absent.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self.send(Method::POST, path, Some(body)).await?.data)
    }

    /// PUT and return `data`, which may be absent.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self.send(Method::PUT, path, Some(body)).await?.data)
    }

    /// POST, ignoring any `data`. `body` may be [`NO_BODY`].
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ClientError> {
        self.send::<serde_json::Value, B>(Method::POST, path, body)
            .await
            .map(drop)
    }

    /// PUT, ignoring any `data`. `body` may be [`NO_BODY`].
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn put_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ClientError> {
        self.send::<serde_json::Value, B>(Method::PUT, path, body)
            .await
            .map(drop)
    }

    /// DELETE, ignoring any `data`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`].
    pub async fn delete_unit(&self, path: &str) -> Result<(), ClientError> {
        self.send::<serde_json::Value, ()>(Method::DELETE, path, NO_BODY)
            .await
            .map(drop)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// `POST /auth/login`. On success the returned credential is persisted.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection message on bad credentials, or
    /// `Credentials` if the token cannot be stored.
    #[instrument(skip_all, fields(email = %email.masked()))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, ClientError> {
        let body = LoginBody {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let response: LoginResponse = self
            .post("/auth/login", &body)
            .await?
            .ok_or(ClientError::MissingData("/auth/login"))?;

        match response.token.filter(|token| !token.is_blank()) {
            Some(token) => self.inner.credentials.save(&token)?,
            None => warn!("login succeeded without a token"),
        }

        debug!(user_id = %response.user.id, "Signed in");
        Ok(response.user)
    }

    /// `POST /auth/refresh`. A returned token replaces the stored one.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`], or `Credentials` if the token cannot be stored.
    #[instrument(skip(self))]
    pub async fn refresh_credential(&self) -> Result<bool, ClientError> {
        #[derive(serde::Deserialize)]
        struct Refreshed {
            token: Option<BearerToken>,
        }

        let refreshed = self
            .send::<Refreshed, ()>(Method::POST, "/auth/refresh", NO_BODY)
            .await?
            .data;
        match refreshed.and_then(|r| r.token).filter(|t| !t.is_blank()) {
            Some(token) => {
                self.inner.credentials.save(&token)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Build the error for a non-2xx, non-401 response.
fn rejection(status: StatusCode, body: &str) -> ClientError {
    let fallback = format!("HTTP error! status: {}", status.as_u16());
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) => ClientError::Rejected {
            status: status.as_u16(),
            message: envelope.failure_message(&fallback),
            errors: envelope.errors,
        },
        Err(_) => ClientError::Rejected {
            status: status.as_u16(),
            message: fallback,
            errors: Vec::new(),
        },
    }
}

/// Percent-encode a value for use as one path segment.
#[must_use]
pub fn segment(value: impl AsRef<str>) -> String {
    urlencoding::encode(value.as_ref()).into_owned()
}

/// Append URL-encoded query pairs to `path`. Empty pairs leave it unchanged.
#[must_use]
pub fn with_query<K, V>(path: &str, pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return path.to_string();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{}", serializer.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(
            &ClientConfig::for_base_url(base),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let api = client("https://localhost:7001/api/");
        assert_eq!(
            api.endpoint_url("/cart/items").unwrap().as_str(),
            "https://localhost:7001/api/cart/items"
        );
        assert_eq!(
            api.endpoint_url("notifications").unwrap().as_str(),
            "https://localhost:7001/api/notifications"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::new(
            &ClientConfig::for_base_url("not a url"),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[test]
    fn test_rejection_uses_body_message() {
        let err = rejection(StatusCode::BAD_REQUEST, r#"{"success":false,"message":"Out of stock"}"#);
        assert_eq!(err.to_string(), "Out of stock");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_rejection_falls_back_to_status() {
        let err = rejection(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP error! status: 502");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query::<&str, &str>("/products", &[]), "/products");
        assert_eq!(
            with_query("/products/search?q=tea%20pot", &[("page", "2")]),
            "/products/search?q=tea%20pot&page=2"
        );
        assert_eq!(
            with_query("/products", &[("search", "çay & kahve")]),
            "/products?search=%C3%A7ay+%26+kahve"
        );
    }

    #[test]
    fn test_segment_encodes() {
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }

    #[tokio::test]
    async fn test_unauthorized_hooks_and_redirect() {
        let api = client("http://127.0.0.1:9");
        api.credentials().save(&BearerToken::new("stale")).unwrap();

        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        api.on_unauthorized(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let mut redirects = api.subscribe_redirects();

        api.handle_unauthorized();

        assert!(!api.has_credential());
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(redirects.recv().await.unwrap(), Redirect::SignIn);
    }
}
