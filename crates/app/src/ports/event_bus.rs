//! Notification bus port — publish/subscribe for in-process notifications.

use std::future::Future;

use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::notification::Notification;

/// Publishes notifications to interested in-process subscribers.
pub trait NotificationPublisher {
    /// Publish a notification to all current subscribers.
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;
}

impl<T: NotificationPublisher + Send + Sync> NotificationPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).publish(notification)
    }
}
