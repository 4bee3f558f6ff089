//! # pulsehub-adapter-log-kafka
//!
//! Log broker adapter — one consumer-group member over the domain-event
//! topics.
//!
//! ## Responsibilities
//! - Join the consumer group and subscribe to the configured topics
//! - Hand every payload to the
//!   [`InboundEventSink`](pulsehub_app::ports::InboundEventSink)
//! - Commit the offset only after the sink reports success, so a crash
//!   resumes from committed state instead of replaying the entire history
//! - Reconnect forever with a fixed delay on any client error
//!
//! Messages are processed sequentially off one `recv` loop, which preserves
//! the broker's in-order delivery per partition key.
//!
//! ## Dependency rule
//! Depends on `pulsehub-app` and `pulsehub-domain`. Never on other adapters.

mod error;

pub use error::LogSourceError;

use rdkafka::ClientConfig;
use rdkafka::Message;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use tracing::{error, info, warn};

use pulsehub_app::ports::InboundEventSink;

/// Delay between reconnect attempts after a consumer failure.
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Connection settings for the log broker.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    /// Consumer group id; offsets are committed per group.
    pub group_id: String,
    /// Topics carrying domain events.
    pub topics: Vec<String>,
}

/// Consumer loop over the domain-event topics.
pub struct LogEventSource {
    config: LogConfig,
}

impl LogEventSource {
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// Consume forever. Any client error tears the consumer down and a fresh
    /// one resubscribes from the committed offsets after a fixed delay.
    pub async fn run<S: InboundEventSink>(self, sink: S) {
        loop {
            if let Err(err) = self.consume(&sink).await {
                error!(error = %err, "log consumer failed, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn consume<S: InboundEventSink>(&self, sink: &S) -> Result<(), LogSourceError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set("group.id", &self.config.group_id)
            // Ack-after-success: offsets move only once processing finished.
            .set("enable.auto.commit", "false")
            // A fresh group starts at the log head; an existing one resumes
            // from its committed offset on rebalance or restart.
            .set("auto.offset.reset", "earliest")
            .create()?;

        let topics: Vec<&str> = self.config.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;
        info!(
            group = %self.config.group_id,
            topics = ?self.config.topics,
            "log consumer subscribed"
        );

        loop {
            let message = consumer.recv().await?;
            let Some(payload) = message.payload() else {
                warn!(
                    topic = message.topic(),
                    partition = message.partition(),
                    offset = message.offset(),
                    "skipping log message without payload"
                );
                consumer.commit_message(&message, CommitMode::Async)?;
                continue;
            };

            match sink.ingest_event(payload).await {
                Ok(()) => consumer.commit_message(&message, CommitMode::Async)?,
                Err(err) => {
                    // Uncommitted: the broker redelivers from the committed
                    // offset after the next rebalance or restart.
                    warn!(
                        error = %err,
                        topic = message.topic(),
                        partition = message.partition(),
                        offset = message.offset(),
                        "event processing failed, offset not committed"
                    );
                }
            }
        }
    }
}
