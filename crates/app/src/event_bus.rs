//! In-process notification bus backed by a tokio broadcast channel.
//!
//! The bus decouples the producers of notifications (ingestion, automation
//! engine) from the delivery fan-out that drains it.

use std::future::Future;

use tokio::sync::broadcast;

use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::notification::Notification;

use crate::ports::NotificationPublisher;

/// In-process notification bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the notification is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Notification>,
}

impl InProcessEventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications on this bus.
    ///
    /// Returns a receiver that will get all notifications published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationPublisher for InProcessEventBus {
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        // broadcast::send fails only when there are zero receivers,
        // which is fine — we simply ignore the error.
        let _ = self.sender.send(notification);
        async { Ok(()) }
    }
}
