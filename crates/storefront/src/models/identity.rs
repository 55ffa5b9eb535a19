//! Signed-in user and the requests that create or change one.

use bazaar_core::{BearerToken, Email, UserId, UserRole};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    #[serde(deserialize_with = "Email::deserialize_from_server")]
    pub email: Email,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

impl Identity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Full name when set, otherwise the local part of the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            self.email.local_part()
        } else {
            name
        }
    }

    /// Apply a partial profile update locally.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(full_name) = &update.full_name {
            self.full_name.clone_from(full_name);
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = Some(avatar.clone());
        }
    }
}

/// Partial profile update for `PUT /user/profile`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none() && self.avatar.is_none()
    }
}

/// Registration request.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: Email,
    pub password: SecretString,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Borrowed wire form of [`SignUp`]. The password only leaves its secret
/// wrapper while the body is being serialized.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

impl<'a> From<&'a SignUp> for SignUpBody<'a> {
    fn from(request: &'a SignUp) -> Self {
        Self {
            email: request.email.as_str(),
            password: request.password.expose_secret(),
            full_name: &request.full_name,
            phone: request.phone.as_deref(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `data` of a successful `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: Option<BearerToken>,
    pub user: Identity,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Identity {
        serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "email": "ayse@example.com",
            "fullName": "Ayşe Yılmaz",
            "role": "customer",
            "isEmailVerified": false
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let identity = sample();
        assert_eq!(identity.id.as_str(), "u-1");
        assert_eq!(identity.full_name, "Ayşe Yılmaz");
        assert!(identity.is_active);
        assert!(!identity.is_admin());
        assert!(identity.created_at.is_none());
    }

    #[test]
    fn test_numeric_id_is_accepted() {
        let identity: Identity = serde_json::from_value(serde_json::json!({
            "id": 42,
            "email": "x@example.com",
            "role": "admin"
        }))
        .unwrap();
        assert_eq!(identity.id.as_str(), "42");
        assert!(identity.is_admin());
    }

    #[test]
    fn test_server_email_without_dot_is_accepted() {
        let identity: Identity = serde_json::from_value(serde_json::json!({
            "id": "u-admin",
            "email": "admin@localhost",
            "role": "admin"
        }))
        .unwrap();
        assert_eq!(identity.email.as_str(), "admin@localhost");

        let err = serde_json::from_value::<Identity>(serde_json::json!({
            "id": "u-admin",
            "email": "not-an-email"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut identity = sample();
        assert_eq!(identity.display_name(), "Ayşe Yılmaz");
        identity.full_name = "  ".to_string();
        assert_eq!(identity.display_name(), "ayse");
    }

    #[test]
    fn test_apply_partial_update() {
        let mut identity = sample();
        identity.apply(&ProfileUpdate {
            phone: Some("+90 555 000 00 00".to_string()),
            ..ProfileUpdate::default()
        });
        assert_eq!(identity.full_name, "Ayşe Yılmaz");
        assert_eq!(identity.phone.as_deref(), Some("+90 555 000 00 00"));
    }

    #[test]
    fn test_sign_up_body_wire_names() {
        let request = SignUp {
            email: Email::parse("new@example.com").unwrap(),
            password: SecretString::from("hunter22".to_string()),
            full_name: "New User".to_string(),
            phone: None,
        };
        let body = serde_json::to_value(SignUpBody::from(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "email": "new@example.com",
                "password": "hunter22",
                "fullName": "New User"
            })
        );
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            full_name: Some("A".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"fullName": "A"}));
        assert!(ProfileUpdate::default().is_empty());
    }
}
