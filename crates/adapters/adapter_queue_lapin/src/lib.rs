//! # pulsehub-adapter-queue-lapin
//!
//! Queue broker adapter — the acknowledge/requeue side of ingestion, plus the
//! outbound device-command publisher.
//!
//! ## Responsibilities
//! - Consume the device-status and automation-trigger queues
//! - Acknowledge a delivery only after the
//!   [`InboundEventSink`](pulsehub_app::ports::InboundEventSink) reports
//!   success; negative-acknowledge with requeue on transient failure
//! - Publish [`DeviceCommand`](pulsehub_domain::command::DeviceCommand)s to
//!   the command queue as persistent messages
//! - Reconnect forever with a fixed delay when the connection drops
//!
//! Malformed payloads are the sink's problem: it drops them with a warning
//! and reports success, so they are acked and cannot requeue forever.
//!
//! ## Dependency rule
//! Depends on `pulsehub-app` and `pulsehub-domain`. Never on other adapters.

mod error;

pub use error::QueueError;

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{error, info, warn};

use pulsehub_app::ports::{CommandPublisher, InboundEventSink};
use pulsehub_domain::command::DeviceCommand;
use pulsehub_domain::error::PulseHubError;

/// Delay between reconnect attempts after a connection failure.
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Connection settings for the queue broker.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// AMQP connection URL.
    pub url: String,
    /// Queue carrying device status updates.
    pub status_queue: String,
    /// Queue carrying direct automation trigger requests.
    pub trigger_queue: String,
    /// Queue device commands are published to.
    pub command_queue: String,
}

async fn declare_durable(channel: &Channel, queue: &str) -> Result<(), QueueError> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Consumer loops over the status and trigger queues.
pub struct QueueConsumer {
    config: QueueConfig,
}

impl QueueConsumer {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    /// Consume forever, rebuilding the connection on any failure.
    pub async fn run<S: InboundEventSink>(self, sink: S) {
        loop {
            if let Err(err) = self.consume(&sink).await {
                error!(error = %err, "queue consumer failed, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn consume<S: InboundEventSink>(&self, sink: &S) -> Result<(), QueueError> {
        let connection =
            Connection::connect(&self.config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        declare_durable(&channel, &self.config.status_queue).await?;
        declare_durable(&channel, &self.config.trigger_queue).await?;

        let mut status = channel
            .basic_consume(
                &self.config.status_queue,
                "pulsehub-status",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        let mut triggers = channel
            .basic_consume(
                &self.config.trigger_queue,
                "pulsehub-triggers",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        info!(
            status_queue = %self.config.status_queue,
            trigger_queue = %self.config.trigger_queue,
            "queue consumer connected"
        );

        loop {
            tokio::select! {
                delivery = status.next() => {
                    let Some(delivery) = delivery else {
                        return Err(QueueError::ConsumerClosed);
                    };
                    let delivery = delivery?;
                    settle(&delivery, sink.ingest_status(&delivery.data).await).await?;
                }
                delivery = triggers.next() => {
                    let Some(delivery) = delivery else {
                        return Err(QueueError::ConsumerClosed);
                    };
                    let delivery = delivery?;
                    settle(&delivery, sink.ingest_trigger(&delivery.data).await).await?;
                }
            }
        }
    }
}

/// Ack on success, nack-with-requeue on transient failure.
async fn settle(delivery: &Delivery, outcome: Result<(), PulseHubError>) -> Result<(), QueueError> {
    match outcome {
        Ok(()) => delivery.ack(BasicAckOptions::default()).await?,
        Err(err) => {
            warn!(error = %err, "processing failed, requeueing delivery");
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..BasicNackOptions::default()
                })
                .await?;
        }
    }
    Ok(())
}

/// Publishes device commands to the command queue.
pub struct LapinCommandPublisher {
    // The channel dies with its connection; keep both alive together.
    _connection: Connection,
    channel: Channel,
    queue: String,
}

impl LapinCommandPublisher {
    /// Connect and declare the command queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the connection or declaration fails.
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        let connection =
            Connection::connect(&config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        declare_durable(&channel, &config.command_queue).await?;
        Ok(Self {
            _connection: connection,
            channel,
            queue: config.command_queue.clone(),
        })
    }
}

impl CommandPublisher for LapinCommandPublisher {
    async fn publish(&self, command: DeviceCommand) -> Result<(), PulseHubError> {
        let payload = serde_json::to_vec(&command)?;
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                // Persistent delivery: commands survive a broker restart.
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(QueueError::from)?
            .await
            .map_err(QueueError::from)?;
        Ok(())
    }
}
