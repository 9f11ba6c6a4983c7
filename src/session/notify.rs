//! Transient user notifications.

use tokio::sync::broadcast;

use crate::session::types::{Notification, NotificationLevel};

const NOTIFICATION_BUFFER: usize = 64;

/// Fan-out of toasts to whoever renders them. Every notification is also
/// logged, so nothing is lost when no one is listening.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self { tx }
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Success, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, message.into());
    }

    fn publish(&self, level: NotificationLevel, message: String) {
        match level {
            NotificationLevel::Error => tracing::error!(%message, "notification"),
            NotificationLevel::Warning => tracing::warn!(%message, "notification"),
            _ => tracing::info!(%message, "notification"),
        }
        // no subscribers is fine
        let _ = self.tx.send(Notification { level, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
