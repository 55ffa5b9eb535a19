use bazaar_core::{NotificationId, NotificationSeverity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message shown in the shopper's notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub severity: NotificationSeverity,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl Notification {
    /// Whether the entry was generated on this client rather than fetched.
    #[must_use]
    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}

pub(crate) const LOCAL_ID_PREFIX: &str = "local-";

/// Ids minted by the client; the server has never heard of them.
pub(crate) fn is_local_id(id: &NotificationId) -> bool {
    id.as_str().starts_with(LOCAL_ID_PREFIX)
}

/// Fields a caller supplies for a client-side notification. The id, timestamp
/// and read flag are filled in by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub severity: NotificationSeverity,
    pub action_url: Option<String>,
}

impl NewNotification {
    #[must_use]
    pub fn new(
        severity: NotificationSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            action_url: None,
        }
    }

    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let notification: Notification = serde_json::from_value(serde_json::json!({
            "id": "n-1",
            "title": "Order shipped",
            "message": "Your order is on the way",
            "type": "success",
            "isRead": false,
            "createdAt": "2024-03-01T12:00:00Z",
            "actionUrl": "/orders/o-1"
        }))
        .unwrap();

        assert_eq!(notification.severity, NotificationSeverity::Success);
        assert_eq!(notification.action_url.as_deref(), Some("/orders/o-1"));
        assert!(!notification.is_local());

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["isRead"], false);
    }
}
