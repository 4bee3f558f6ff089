//! Log-broker-specific error type wrapping rdkafka errors.

use pulsehub_domain::error::PulseHubError;

/// Errors originating from the log broker client.
#[derive(Debug, thiserror::Error)]
pub enum LogSourceError {
    /// Client creation, subscription, or consumption failed.
    #[error("log broker error")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

impl From<LogSourceError> for PulseHubError {
    fn from(err: LogSourceError) -> Self {
        Self::Broker(Box::new(err))
    }
}
