//! Notification feed with optimistic read flags.
//!
//! Marking entries read flips them locally before the request is sent. Each
//! optimistic change is recorded as a [`PendingRead`]; the server's answer
//! either confirms it or rolls back exactly the entries it touched.

use std::sync::Arc;

use bazaar_core::NotificationId;
use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::api::{ApiClient, NO_BODY, segment};
use crate::error::ClientError;
use crate::models::{LOCAL_ID_PREFIX, NewNotification, Notification, is_local_id};
use crate::scoped::{ScopedCell, SessionBound};
use crate::session::{Owner, Session};

const NOTIFICATIONS: &str = "/notifications";
const READ_ALL: &str = "/notifications/read-all";

/// An optimistic read awaiting the server.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRead {
    token: Uuid,
    /// Read flags of the touched entries before the change.
    previous: Vec<(NotificationId, bool)>,
}

impl PendingRead {
    fn covers(&self, id: &NotificationId) -> bool {
        self.previous.iter().any(|(covered, _)| covered == id)
    }
}

#[derive(Debug, Default)]
struct Feed {
    items: Vec<Notification>,
    pending: Vec<PendingRead>,
}

impl Feed {
    /// Flip the selected entries to read and record how they were.
    fn mark_read(&mut self, select: impl Fn(&Notification) -> bool) -> Uuid {
        let token = Uuid::new_v4();
        let mut previous = Vec::new();
        for item in self.items.iter_mut().filter(|item| select(item)) {
            previous.push((item.id.clone(), item.is_read));
            item.is_read = true;
        }
        self.pending.push(PendingRead { token, previous });
        token
    }

    /// Flip selected client-side entries to read. Nothing to confirm.
    fn mark_local_read(&mut self, select: impl Fn(&Notification) -> bool) {
        for item in self.items.iter_mut().filter(|item| item.is_local() && select(item)) {
            item.is_read = true;
        }
    }

    fn take(&mut self, token: Uuid) -> Option<(usize, PendingRead)> {
        let index = self.pending.iter().position(|p| p.token == token)?;
        Some((index, self.pending.remove(index)))
    }

    /// The server accepted the change: no other pending change may undo it.
    fn confirm(&mut self, token: Uuid) {
        let Some((_, confirmed)) = self.take(token) else {
            return;
        };
        for other in &mut self.pending {
            other
                .previous
                .retain(|(id, _)| !confirmed.covers(id));
        }
    }

    /// The server refused the change: restore the entries it touched unless a
    /// later pending change still holds them.
    fn roll_back(&mut self, token: Uuid) {
        let Some((index, failed)) = self.take(token) else {
            return;
        };
        for (id, was_read) in failed.previous {
            let mut still_held = false;
            for (position, other) in self.pending.iter_mut().enumerate() {
                let Some(entry) = other.previous.iter_mut().find(|(covered, _)| *covered == id)
                else {
                    continue;
                };
                still_held = true;
                // Later changes recorded our optimistic value as their "before".
                if position >= index {
                    entry.1 = was_read;
                }
            }
            if !still_held && let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
                item.is_read = was_read;
            }
        }
    }
}

/// The signed-in shopper's notifications.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<NotificationInner>,
}

struct NotificationInner {
    session: Session,
    feed: ScopedCell<Feed>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("unread", &self.unread_count())
            .field("pending", &self.pending_operations())
            .finish_non_exhaustive()
    }
}

impl NotificationStore {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                session: session.clone(),
                feed: ScopedCell::new(session),
            }),
        }
    }

    fn api(&self) -> &ApiClient {
        self.inner.session.api()
    }

    /// Newest first, as fetched, with local entries prepended.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.feed.read(|feed| feed.items.clone())
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner
            .feed
            .read(|feed| feed.items.iter().filter(|n| !n.is_read).count())
    }

    /// Optimistic changes still waiting for the server.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.inner.feed.read(|feed| feed.pending.len())
    }

    /// `GET /notifications`, replacing the feed.
    ///
    /// # Errors
    ///
    /// Adapter errors; the feed keeps its last good value.
    #[instrument(skip(self))]
    pub async fn fetch_notifications(&self) -> Result<(), ClientError> {
        let Some(owner) = self.inner.session.current_owner() else {
            return Ok(());
        };
        let items: Vec<Notification> = self.api().get_list(NOTIFICATIONS).await?;
        debug!(count = items.len(), "Fetched notifications");
        self.inner.feed.replace_for(
            &owner,
            Feed {
                items,
                pending: Vec::new(),
            },
        );
        Ok(())
    }

    /// Mark one entry read, optimistically. Entries created with
    /// [`add_notification`](Self::add_notification) are only flipped locally.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous. On an adapter error the entry is
    /// restored and the error returned.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_as_read(&self, id: &NotificationId) -> Result<(), ClientError> {
        if is_local_id(id) {
            self.inner.feed.write(|feed| feed.mark_local_read(|n| &n.id == id));
            return Ok(());
        }

        let owner = self.owner("manage notifications")?;
        let token = self.inner.feed.write(|feed| feed.mark_read(|n| &n.id == id));

        let result = self
            .api()
            .put_unit(&format!("{NOTIFICATIONS}/{}/read", segment(id)), NO_BODY)
            .await;
        self.settle(&owner, token, result)
    }

    /// Mark every entry read, optimistically.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous. On an adapter error every fetched
    /// entry the call touched is restored and the error returned; local
    /// entries stay read.
    #[instrument(skip(self))]
    pub async fn mark_all_as_read(&self) -> Result<(), ClientError> {
        let owner = self.owner("manage notifications")?;
        let token = self.inner.feed.write(|feed| {
            feed.mark_local_read(|_| true);
            feed.mark_read(|n| !n.is_local())
        });

        let result = self.api().put_unit(READ_ALL, NO_BODY).await;
        self.settle(&owner, token, result)
    }

    fn settle(
        &self,
        owner: &Owner,
        token: Uuid,
        result: Result<(), ClientError>,
    ) -> Result<(), ClientError> {
        match result {
            Ok(()) => {
                self.inner.feed.write_for(owner, |feed| feed.confirm(token));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Marking notifications read failed, rolling back");
                self.inner.feed.write_for(owner, |feed| feed.roll_back(token));
                Err(e)
            }
        }
    }

    /// Prepend a client-generated notification. No request is made.
    ///
    /// While anonymous the entry lives until the next sign-in.
    pub fn add_notification(&self, notification: NewNotification) -> Notification {
        let created = Notification {
            id: NotificationId::new(format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4())),
            title: notification.title,
            message: notification.message,
            severity: notification.severity,
            is_read: false,
            created_at: Utc::now(),
            action_url: notification.action_url,
        };
        self.inner
            .feed
            .write(|feed| feed.items.insert(0, created.clone()));
        created
    }

    fn owner(&self, action: &'static str) -> Result<Owner, ClientError> {
        self.inner.session.require_owner(action)
    }
}

impl SessionBound for NotificationStore {
    const NAME: &'static str = "notifications";

    async fn refresh(&self) -> Result<(), ClientError> {
        self.fetch_notifications().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::NotificationSeverity;

    use super::*;

    fn item(id: &str, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::new(id),
            title: id.to_string(),
            message: String::new(),
            severity: NotificationSeverity::Info,
            is_read,
            created_at: Utc::now(),
            action_url: None,
        }
    }

    fn feed(items: &[(&str, bool)]) -> Feed {
        Feed {
            items: items.iter().map(|(id, read)| item(id, *read)).collect(),
            pending: Vec::new(),
        }
    }

    fn read_flags(feed: &Feed) -> Vec<bool> {
        feed.items.iter().map(|n| n.is_read).collect()
    }

    #[test]
    fn test_roll_back_restores_only_touched_entries() {
        let mut feed = feed(&[("a", false), ("b", false)]);
        let token = feed.mark_read(|n| n.id.as_str() == "a");
        assert_eq!(read_flags(&feed), vec![true, false]);

        feed.roll_back(token);
        assert_eq!(read_flags(&feed), vec![false, false]);
        assert!(feed.pending.is_empty());
    }

    #[test]
    fn test_confirm_keeps_flags() {
        let mut feed = feed(&[("a", false)]);
        let token = feed.mark_read(|_| true);
        feed.confirm(token);
        assert_eq!(read_flags(&feed), vec![true]);
        assert!(feed.pending.is_empty());
    }

    #[test]
    fn test_failed_single_read_under_pending_read_all() {
        let mut feed = feed(&[("a", false), ("b", false)]);
        let single = feed.mark_read(|n| n.id.as_str() == "a");
        let all = feed.mark_read(|_| true);

        // The single read fails while read-all is still in flight: "a" stays
        // read, but read-all now remembers that "a" was originally unread.
        feed.roll_back(single);
        assert_eq!(read_flags(&feed), vec![true, true]);

        feed.roll_back(all);
        assert_eq!(read_flags(&feed), vec![false, false]);
    }

    #[test]
    fn test_confirmed_read_survives_later_rollback() {
        let mut feed = feed(&[("a", false), ("b", false)]);
        let single = feed.mark_read(|n| n.id.as_str() == "a");
        let all = feed.mark_read(|_| true);

        feed.confirm(single);
        feed.roll_back(all);
        assert_eq!(read_flags(&feed), vec![true, false]);
    }

    #[test]
    fn test_roll_back_unknown_token_is_noop() {
        let mut feed = feed(&[("a", true)]);
        feed.roll_back(Uuid::new_v4());
        assert_eq!(read_flags(&feed), vec![true]);
    }

    #[test]
    fn test_local_entries_flip_without_pending_token() {
        let mut feed = feed(&[("local-1", false), ("a", false)]);
        feed.mark_local_read(|_| true);
        let token = feed.mark_read(|n| !n.is_local());
        assert_eq!(read_flags(&feed), vec![true, true]);

        feed.roll_back(token);
        assert_eq!(read_flags(&feed), vec![true, false]);
    }
}
