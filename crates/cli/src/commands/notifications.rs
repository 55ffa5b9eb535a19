//! Notification commands.

use std::fmt::Write as _;

use bazaar_core::NotificationId;
use bazaar_storefront::AppState;

use super::emit;
use crate::render;

pub async fn list(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let store = state.notifications();
    store.fetch_notifications().await?;
    let items = store.notifications();
    if items.is_empty() {
        emit("No notifications.");
        return Ok(());
    }
    let mut text: String = items.iter().map(render::notification).collect();
    let _ = writeln!(text, "{} unread", store.unread_count());
    emit(&text);
    Ok(())
}

pub async fn read(state: &AppState, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let store = state.notifications();
    store.fetch_notifications().await?;
    store.mark_as_read(&NotificationId::new(id)).await?;
    emit(&format!("{} unread", store.unread_count()));
    Ok(())
}

pub async fn read_all(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let store = state.notifications();
    store.fetch_notifications().await?;
    store.mark_all_as_read().await?;
    emit("All notifications marked read.");
    Ok(())
}
