//! User-facing notifications.

use crate::store::{Action, StateStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Display duration of request-failure notifications.
pub const ERROR_NOTIFICATION_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub text: String,
    /// Display duration in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            kind,
            text: text.into(),
            timeout_ms,
        }
    }

    /// Error notification with the standard request-failure duration.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, text, ERROR_NOTIFICATION_TIMEOUT_MS)
    }
}

/// Capability to show a notification.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification);
}

/// Forwards notifications to the store's `addNotification` action unchanged.
pub struct StoreDispatcher {
    store: Arc<dyn StateStore>,
}

impl StoreDispatcher {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

impl NotificationDispatcher for StoreDispatcher {
    fn dispatch(&self, notification: Notification) {
        self.store.dispatch(Action::AddNotification(notification));
    }
}
