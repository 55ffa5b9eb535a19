//! Bearer credential type.
//!
//! The API authenticates with an opaque bearer token. It is the only piece
//! of client state persisted between runs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque bearer token proving an identity to the API.
///
/// `Debug` never prints the token. Serialization does, since the token has
/// to reach durable storage; callers decide where that goes.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token, e.g. for an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the token is blank. Blank tokens are treated as absent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }

    /// Value for an `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

impl PartialEq for BearerToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for BearerToken {}

impl Serialize for BearerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for BearerToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = BearerToken::new("eyJhbGciOi.secret");
        assert_eq!(format!("{token:?}"), "BearerToken([REDACTED])");
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(BearerToken::new("abc").authorization_header(), "Bearer abc");
    }

    #[test]
    fn test_blank() {
        assert!(BearerToken::new("  ").is_blank());
        assert!(!BearerToken::new("t").is_blank());
    }

    #[test]
    fn test_serde() {
        let token: BearerToken = serde_json::from_str("\"jwt\"").unwrap();
        assert_eq!(token, BearerToken::new("jwt"));
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"jwt\"");
    }
}
