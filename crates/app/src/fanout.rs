//! Delivery fan-out — local session writes plus cross-instance republish.
//!
//! Every delivery writes to the matching local connections *and* publishes
//! the notification onto the shared relay channel, even when every local
//! write succeeded: the same user may hold connections on other instances,
//! so local success never implies all sessions were reached. Envelopes are
//! tagged with the publishing instance so the echo of our own publish is
//! skipped instead of delivered twice.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use pulsehub_domain::id::{InstanceId, UserId};
use pulsehub_domain::notification::Notification;
use pulsehub_domain::relay::RelayEnvelope;

use crate::ports::{ConnectionTransport, RelayPublisher};
use crate::registry::SessionRegistry;

/// Fans notifications out to local sessions and sibling instances.
pub struct DeliveryFanout<T, R> {
    registry: Arc<SessionRegistry<T>>,
    relay: R,
    origin: InstanceId,
}

impl<T, R> DeliveryFanout<T, R>
where
    T: ConnectionTransport,
    R: RelayPublisher + Send + Sync,
{
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<T>>, relay: R, origin: InstanceId) -> Self {
        Self {
            registry,
            relay,
            origin,
        }
    }

    /// Deliver to one user's local connections and republish on the relay.
    ///
    /// Returns whether at least one local write succeeded.
    pub async fn deliver_to_user(&self, user_id: UserId, notification: &Notification) -> bool {
        let delivered = self.deliver_local_to_user(user_id, notification);
        self.relay_out(notification).await;
        delivered
    }

    /// Deliver to every local connection and republish on the relay.
    pub async fn broadcast(&self, notification: &Notification) {
        self.broadcast_local(notification);
        self.relay_out(notification).await;
    }

    /// Route a notification by its target: an explicit broadcast flag or a
    /// missing user id means every connection, otherwise the user's sessions.
    pub async fn dispatch(&self, notification: &Notification) {
        match notification.user_id {
            Some(user_id) if !notification.broadcast => {
                let _ = self.deliver_to_user(user_id, notification).await;
            }
            _ => self.broadcast(notification).await,
        }
    }

    /// Handle an envelope received from the relay channel.
    ///
    /// Our own envelopes are skipped — the local writes already happened when
    /// we published. Foreign envelopes go through the identical local-only
    /// lookup; a user with no connections here makes this a no-op, not an
    /// error.
    pub fn handle_relayed(&self, envelope: &RelayEnvelope) {
        if envelope.origin == self.origin {
            return;
        }
        let notification = &envelope.notification;
        match notification.user_id {
            Some(user_id) if !notification.broadcast => {
                let _ = self.deliver_local_to_user(user_id, notification);
            }
            _ => self.broadcast_local(notification),
        }
    }

    /// Drain the in-process bus, dispatching every notification.
    ///
    /// Runs until the bus is dropped. A lagged receiver logs the number of
    /// missed notifications and keeps going.
    pub async fn run(&self, mut rx: broadcast::Receiver<Notification>) {
        loop {
            match rx.recv().await {
                Ok(notification) => self.dispatch(&notification).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "delivery loop lagged behind the notification bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn deliver_local_to_user(&self, user_id: UserId, notification: &Notification) -> bool {
        let Some(frame) = serialize(notification) else {
            return false;
        };
        let connections = self.registry.connections_for(user_id);
        let mut delivered = 0usize;
        for transport in &connections {
            if transport.send(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                debug!(user_id = %user_id, "write to closed or congested connection dropped");
            }
        }
        debug!(
            kind = %notification.kind,
            user_id = %user_id,
            delivered,
            connections = connections.len(),
            "delivered notification to user"
        );
        delivered > 0
    }

    fn broadcast_local(&self, notification: &Notification) {
        let Some(frame) = serialize(notification) else {
            return;
        };
        let connections = self.registry.all_connections();
        let mut delivered = 0usize;
        for transport in &connections {
            if transport.send(Arc::clone(&frame)) {
                delivered += 1;
            }
        }
        debug!(
            kind = %notification.kind,
            delivered,
            connections = connections.len(),
            "broadcast notification"
        );
    }

    async fn relay_out(&self, notification: &Notification) {
        let envelope = RelayEnvelope::new(self.origin, notification.clone());
        if let Err(err) = self.relay.publish(envelope).await {
            // Relay connectivity is recovered by the relay adapter's retry
            // loop; local delivery already happened and stands.
            warn!(error = %err, "failed to republish notification on the relay");
        }
    }
}

/// Serialize once, share the frame across all connection writes.
fn serialize(notification: &Notification) -> Option<Arc<String>> {
    match serde_json::to_string(notification) {
        Ok(json) => Some(Arc::new(json)),
        Err(err) => {
            warn!(kind = %notification.kind, error = %err, "failed to serialize notification");
            None
        }
    }
}
