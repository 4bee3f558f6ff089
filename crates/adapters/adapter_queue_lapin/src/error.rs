//! Queue-broker-specific error type wrapping lapin errors.

use pulsehub_domain::error::PulseHubError;

/// Errors originating from the queue broker client.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Connection, channel, consume, or publish failure.
    #[error("queue broker error")]
    Amqp(#[from] lapin::Error),

    /// The consumer stream ended, usually because the connection dropped.
    #[error("queue consumer closed")]
    ConsumerClosed,
}

impl From<QueueError> for PulseHubError {
    fn from(err: QueueError) -> Self {
        Self::Broker(Box::new(err))
    }
}
