//! Error type shared by the API adapter and every state container.

use thiserror::Error;

use crate::credentials::CredentialStoreError;

/// Errors surfaced by [`ApiClient`](crate::api::ApiClient) and the containers
/// built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: DNS, connect, TLS, or a body that could not be read.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The API answered 401. The stored credential has already been removed.
    #[error("unauthorized: please sign in again")]
    Unauthorized,

    /// The API refused the request, either with a non-2xx status or with a
    /// `success: false` envelope.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        errors: Vec<String>,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// A local precondition: the operation needs a signed-in identity.
    #[error("you must be signed in to {0}")]
    NotAuthenticated(&'static str),

    /// The write succeeded on the server but re-fetching the collection
    /// afterwards failed. The local snapshot is marked stale.
    #[error("change saved, but refreshing local state failed: {0}")]
    Resync(#[source] Box<ClientError>),

    #[error("credential store error: {0}")]
    Credentials(#[from] CredentialStoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A successful envelope arrived without the `data` the caller needs.
    #[error("response from {0} carried no data")]
    MissingData(&'static str),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl ClientError {
    /// Whether retrying the same idempotent request could succeed.
    ///
    /// Transport errors, timeouts and 5xx rejections qualify. A `success:
    /// false` envelope on a 2xx status never does.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_builder() && !err.is_decode(),
            Self::Timeout => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this failure means the credential is gone.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// HTTP status of a rejection, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// A message suitable for showing to a shopper.
    ///
    /// Server-provided messages pass through unchanged; internal failures
    /// are replaced with something generic.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Timeout => "The server took too long to respond. Please try again.".to_string(),
            Self::Http(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::NotAuthenticated(action) => format!("Please sign in to {action}."),
            Self::InvalidInput(message) => message.clone(),
            Self::Resync(inner) => format!(
                "Your change was saved, but the list could not be refreshed: {}",
                inner.user_message()
            ),
            Self::Decode { .. } | Self::MissingData(_) | Self::Credentials(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}
