//! The `{success, data, message, errors}` wrapper every API response uses.

use serde::{Deserialize, Serialize};

/// Response envelope returned by every REST endpoint.
///
/// `data` is optional because mutation endpoints frequently reply with only
/// `{"success": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the server considers the call successful.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Payload, when the endpoint returns one.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Human-readable message, usually present on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Field-level validation messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

const fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    /// A successful envelope carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: Vec::new(),
        }
    }

    /// A failed envelope with a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: Vec::new(),
        }
    }

    /// The message to show for a failed envelope.
    ///
    /// Falls back to the first validation error, then to `fallback`.
    #[must_use]
    pub fn failure_message(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.errors.first().map(String::as_str))
            .unwrap_or(fallback)
            .to_string()
    }

    /// Transform the payload, keeping the envelope metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_success_body() {
        let env: Envelope<serde_json::Value> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(env.success);
        assert!(env.data.is_none());
    }

    #[test]
    fn test_null_data() {
        let env: Envelope<Vec<u32>> =
            serde_json::from_str(r#"{"success":true,"data":null}"#).unwrap();
        assert!(env.data.is_none());
    }

    #[test]
    fn test_failure_message_fallbacks() {
        let env: Envelope<()> = serde_json::from_str(
            r#"{"success":false,"message":"","errors":["Email is taken"]}"#,
        )
        .unwrap();
        assert_eq!(env.failure_message("Request failed"), "Email is taken");

        let bare: Envelope<()> = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(bare.failure_message("Request failed"), "Request failed");

        assert_eq!(Envelope::<()>::failure("Out of stock").failure_message("x"), "Out of stock");
    }

    #[test]
    fn test_map() {
        let env = Envelope::ok(2).map(|n| n * 10);
        assert_eq!(env.data, Some(20));
    }
}
