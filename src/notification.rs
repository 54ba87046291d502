//! Push notifications and background sync.
//!
//! Both are placeholders with a fixed shape: a push payload becomes one
//! notification with two actions, and a sync for the configured tag is
//! acknowledged without any queue behind it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Action that opens the site root.
pub const EXPLORE_ACTION: &str = "explore";
/// Action that only dismisses.
pub const CLOSE_ACTION: &str = "close";

const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// JSON body of a push message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: Option<serde_json::Value>,
}

impl PushPayload {
    /// Parse a raw push message.
    ///
    /// # Errors
    /// `Error::Deserialization` if the bytes are not a JSON object.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Deserialization(format!("invalid push payload: {}", e)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: u64,
    pub primary_key: Option<serde_json::Value>,
}

/// A notification the host should display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for `payload`, using `icon` for the icon, the
    /// badge and both actions.
    pub fn from_payload(payload: PushPayload, icon: &str) -> Self {
        let action = |action: &str, title: &str| NotificationAction {
            action: action.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
        };

        Notification {
            title: payload.title,
            body: payload.body,
            icon: icon.to_string(),
            badge: icon.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: now_millis(),
                primary_key: payload.primary_key,
            },
            actions: vec![
                action(EXPLORE_ACTION, "View Portfolio"),
                action(CLOSE_ACTION, "Close"),
            ],
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Turn a push message into a notification.
///
/// A push without data shows nothing.
pub fn on_push(data: Option<&[u8]>, icon: &str) -> Result<Option<Notification>> {
    let Some(bytes) = data else {
        debug!("Push without payload ignored");
        return Ok(None);
    };
    let payload = PushPayload::from_bytes(bytes)?;
    info!("Push received: {}", payload.title);
    Ok(Some(Notification::from_payload(payload, icon)))
}

/// Path to open for a clicked action. The notification always closes.
pub fn on_click(action: Option<&str>) -> Option<&'static str> {
    match action {
        Some(EXPLORE_ACTION) => Some("/"),
        _ => None,
    }
}

/// Acknowledge a background sync. Returns whether `tag` was ours.
pub fn on_sync(tag: &str, sync_tag: &str) -> bool {
    if tag != sync_tag {
        debug!("Ignoring sync for unknown tag {}", tag);
        return false;
    }
    // No outbox exists yet; submissions are not replayed.
    info!("Syncing {} submissions", tag);
    true
}
