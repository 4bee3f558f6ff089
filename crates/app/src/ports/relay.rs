//! Relay port — publishing notifications to the cross-instance channel.
//!
//! The relay is shared, unowned infrastructure: every instance is a peer
//! producer and consumer, and remote delivery always goes through it — never
//! through a lookup into another instance's registry.

use std::future::Future;

use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::relay::RelayEnvelope;

/// Publishes relay envelopes to all subscribed instances.
pub trait RelayPublisher {
    /// Publish one envelope onto the shared channel.
    fn publish(
        &self,
        envelope: RelayEnvelope,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;
}

impl<T: RelayPublisher + Send + Sync> RelayPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        envelope: RelayEnvelope,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).publish(envelope)
    }
}
