//! Relay-specific error type wrapping redis errors.

use pulsehub_domain::error::PulseHubError;

/// Errors originating from the relay channel client.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Connection, subscription, or publish failure.
    #[error("relay channel error")]
    Redis(#[from] redis::RedisError),
}

impl From<RelayError> for PulseHubError {
    fn from(err: RelayError) -> Self {
        Self::Relay(Box::new(err))
    }
}
