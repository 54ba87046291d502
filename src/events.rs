//! Typed worker events and their outcomes.
//!
//! The host translates whatever it receives (a browser event, a test call,
//! a message from a page) into an [`Event`] and acts on the returned
//! [`EventOutcome`]. The worker never performs host actions itself: showing
//! a notification or opening a window is described, not done.

use crate::lifecycle::ActivationReport;
use crate::notification::Notification;
use crate::request::Request;
use crate::responder::Served;
use crate::router::PassReason;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kinds of events a worker can listen to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Message,
    Sync,
    Push,
    NotificationClick,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Install,
        EventKind::Activate,
        EventKind::Fetch,
        EventKind::Message,
        EventKind::Sync,
        EventKind::Push,
        EventKind::NotificationClick,
    ];

    /// Every kind.
    pub fn all() -> HashSet<EventKind> {
        Self::ALL.into_iter().collect()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Message => "message",
            EventKind::Sync => "sync",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
        };
        f.write_str(name)
    }
}

/// One incoming event.
#[derive(Clone, Debug)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    /// Raw JSON posted by a page.
    Message(serde_json::Value),
    Sync { tag: String },
    /// Push message body, if any.
    Push(Option<Vec<u8>>),
    NotificationClick { action: Option<String> },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
            Event::Message(_) => EventKind::Message,
            Event::Sync { .. } => EventKind::Sync,
            Event::Push(_) => EventKind::Push,
            Event::NotificationClick { .. } => EventKind::NotificationClick,
        }
    }
}

/// What the host should do after an event.
#[derive(Debug)]
pub enum EventOutcome {
    /// Install succeeded.
    Installed,
    /// Activation finished; clients are claimed.
    Activated(ActivationReport),
    /// Answer the request with this response.
    Respond(Served),
    /// Let the request go to the network untouched.
    Passthrough(PassReason),
    /// Skip the waiting phase.
    SkipWaiting,
    /// A background sync was acknowledged.
    Synced { tag: String },
    /// Display this notification.
    ShowNotification(Notification),
    /// Close the notification, then open `open_window` if set.
    NotificationClicked { open_window: Option<String> },
    /// The worker does not listen to this kind; use host defaults.
    Unhandled,
    /// The event was understood and deliberately dropped.
    Ignored,
}

/// Control message posted from a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a posted message. Anything unrecognized is `None`.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        match ControlMessage::deserialize(message) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Ignoring message {}: {}", message, e);
                None
            }
        }
    }
}
