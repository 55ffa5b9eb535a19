//! Error type for the admin back office.

use bazaar_storefront::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    /// The current identity is signed in but is not an admin.
    #[error("admin access required")]
    NotAdmin,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AdminError {
    /// Text safe to show an operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAdmin => "This action needs an admin account.".to_string(),
            Self::Client(e) => e.user_message(),
        }
    }

    /// Shorthand for a local validation failure.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Client(ClientError::InvalidInput(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_pass_through() {
        let err = AdminError::from(ClientError::NotAuthenticated("view statistics"));
        assert_eq!(err.to_string(), "you must be signed in to view statistics");
        assert!(matches!(AdminError::invalid("x"), AdminError::Client(ClientError::InvalidInput(_))));
    }
}
