//! # pulsehub-adapter-relay-redis
//!
//! Relay adapter — the non-durable pub/sub channel that fans notifications
//! out across process instances.
//!
//! ## Responsibilities
//! - Publish relay envelopes onto one logical channel
//!   (implements [`RelayPublisher`](pulsehub_app::ports::RelayPublisher))
//! - Subscribe every instance to that channel and feed received envelopes to
//!   [`DeliveryFanout::handle_relayed`](pulsehub_app::fanout::DeliveryFanout::handle_relayed)
//! - Reconnect forever with a fixed delay when either side drops
//!
//! The channel is shared, unowned infrastructure: every instance is a peer
//! producer and consumer.
//!
//! ## Dependency rule
//! Depends on `pulsehub-app` and `pulsehub-domain`. Never on other adapters.

mod error;

pub use error::RelayError;

use std::sync::Arc;

use futures::StreamExt;
use redis::aio::ConnectionManager;
use tracing::{error, info, warn};

use pulsehub_app::fanout::DeliveryFanout;
use pulsehub_app::ports::{ConnectionTransport, RelayPublisher};
use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::relay::RelayEnvelope;

/// Delay between reconnect attempts after a subscription failure.
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Connection settings for the relay channel.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Redis connection URL.
    pub url: String,
    /// Pub/sub channel carrying relay envelopes.
    pub channel: String,
}

/// Publisher half of the relay.
pub struct RedisRelay {
    connection: ConnectionManager,
    channel: String,
}

impl RedisRelay {
    /// Connect the auto-reconnecting publisher connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] when the initial connection fails.
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self {
            connection,
            channel: config.channel.clone(),
        })
    }
}

impl RelayPublisher for RedisRelay {
    async fn publish(&self, envelope: RelayEnvelope) -> Result<(), PulseHubError> {
        let payload = serde_json::to_string(&envelope)?;
        let mut connection = self.connection.clone();
        let _subscribers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut connection)
            .await
            .map_err(RelayError::from)?;
        Ok(())
    }
}

/// Subscriber half of the relay.
pub struct RelaySubscriber {
    config: RelayConfig,
}

impl RelaySubscriber {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Subscribe forever, feeding envelopes into the local fan-out.
    pub async fn run<T, R>(self, fanout: Arc<DeliveryFanout<T, R>>)
    where
        T: ConnectionTransport,
        R: RelayPublisher + Send + Sync,
    {
        loop {
            if let Err(err) = self.subscribe(&fanout).await {
                error!(error = %err, "relay subscriber failed, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn subscribe<T, R>(&self, fanout: &DeliveryFanout<T, R>) -> Result<(), RelayError>
    where
        T: ConnectionTransport,
        R: RelayPublisher + Send + Sync,
    {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&self.config.channel).await?;
        info!(channel = %self.config.channel, "relay subscriber connected");

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            let payload: String = message.get_payload()?;
            match serde_json::from_str::<RelayEnvelope>(&payload) {
                Ok(envelope) => fanout.handle_relayed(&envelope),
                Err(err) => warn!(error = %err, "dropping malformed relay envelope"),
            }
        }
        // Stream end means the connection is gone; let the caller reconnect.
        Ok(())
    }
}
