//! Notification sink used by controllers to report outcomes to the view layer.

use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                info!(level = ?notification.level, "{}", notification.message)
            }
            NotificationLevel::Warning => warn!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }
    }
}

/// Fans notifications out to any number of subscribers (toast renderers).
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    /// `capacity` is raised to 1 when zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // No subscriber is not an error; the toast simply is not shown.
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_notifier_delivers_to_subscribers() {
        let notifier = ChannelNotifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.notify(Notification::success("saved"));
        let got = rx.recv().await.expect("notification");
        assert_eq!(got, Notification::success("saved"));
    }

    #[test]
    fn channel_notifier_without_subscribers_does_not_panic() {
        let notifier = ChannelNotifier::new(1);
        notifier.notify(Notification::error("nobody listening"));
    }

    #[tokio::test]
    async fn zero_capacity_channel_still_delivers() {
        let notifier = ChannelNotifier::new(0);
        let mut rx = notifier.subscribe();
        notifier.notify(Notification::warning("queued"));
        assert_eq!(rx.recv().await.expect("notification"), Notification::warning("queued"));
    }
}
