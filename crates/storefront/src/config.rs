//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `BAZAAR_API_BASE_URL` - REST API root (default: `https://localhost:7001/api`)
//! - `BAZAAR_CREDENTIAL_PATH` - Credential file (default: `.bazaar/credentials.json`)
//! - `BAZAAR_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `BAZAAR_RETRY_ATTEMPTS` - Attempts for GET requests, including the first (default: 3)
//! - `BAZAAR_RETRY_BASE_DELAY_MS` - First backoff delay (default: 200)
//! - `BAZAAR_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `BAZAAR_FREE_SHIPPING_THRESHOLD` - Subtotal for free shipping (default: 500)
//! - `BAZAAR_SHIPPING_FLAT_RATE` - Shipping charge below the threshold (default: 29.90)
//! - `BAZAAR_SIGN_UP_POLICY` - `auto_sign_in` or `stay_anonymous` (default: `auto_sign_in`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bazaar_core::ShippingPolicy;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::api::RetryPolicy;
use crate::session::SignUpPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:7001/api";
pub const DEFAULT_CREDENTIAL_PATH: &str = ".bazaar/credentials.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API root that endpoints are appended to
    pub api_base_url: String,
    /// File the bearer credential is persisted in
    pub credential_path: PathBuf,
    /// Upper bound for a single HTTP request
    pub http_timeout: Duration,
    /// Backoff for idempotent requests
    pub retry: RetryPolicy,
    /// How long catalog lookups stay cached
    pub catalog_cache_ttl: Duration,
    /// Free-shipping rule used by the checkout summary
    pub shipping: ShippingPolicy,
    /// What happens to the session after registering
    pub sign_up_policy: SignUpPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
            http_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            catalog_cache_ttl: Duration::from_secs(300),
            shipping: ShippingPolicy::default(),
            sign_up_policy: SignUpPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set to a value
    /// that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let defaults = Self::default();

        let api_base_url = env.get_or_default("BAZAAR_API_BASE_URL", DEFAULT_API_BASE_URL);
        url::Url::parse(&api_base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BAZAAR_API_BASE_URL".to_string(), e.to_string())
        })?;

        let retry = RetryPolicy {
            max_attempts: env.parse_or("BAZAAR_RETRY_ATTEMPTS", defaults.retry.max_attempts)?,
            base_delay: Duration::from_millis(
                env.parse_or("BAZAAR_RETRY_BASE_DELAY_MS", 200_u64)?,
            ),
            ..defaults.retry
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_RETRY_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let shipping = ShippingPolicy {
            free_shipping_threshold: env.parse_or::<Decimal>(
                "BAZAAR_FREE_SHIPPING_THRESHOLD",
                defaults.shipping.free_shipping_threshold,
            )?,
            flat_rate: env
                .parse_or::<Decimal>("BAZAAR_SHIPPING_FLAT_RATE", defaults.shipping.flat_rate)?,
        };

        Ok(Self {
            api_base_url,
            credential_path: env
                .get_optional("BAZAAR_CREDENTIAL_PATH")
                .map_or(defaults.credential_path, PathBuf::from),
            http_timeout: Duration::from_secs(env.parse_or("BAZAAR_HTTP_TIMEOUT_SECS", 15_u64)?),
            retry,
            catalog_cache_ttl: Duration::from_secs(
                env.parse_or("BAZAAR_CATALOG_CACHE_TTL_SECS", 300_u64)?,
            ),
            shipping,
            sign_up_policy: env.parse_or("BAZAAR_SIGN_UP_POLICY", defaults.sign_up_policy)?,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Defaults pointed at a specific API root. Handy for tests and tools.
    #[must_use]
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional environment variable. Empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Parse an environment variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}
