//! Event ingestion multiplexer — normalizes broker payloads into canonical
//! notifications and routes them.
//!
//! The multiplexer's job is purely translation: each known event-type tag
//! maps to a [`Notification`] with a deterministic message derived from the
//! type and payload fields. Unknown tags and malformed payloads are dropped
//! with a warning — they must never crash a consumer loop, and they count as
//! processed so the broker does not redeliver them forever.

use serde_json::Value;
use tracing::{debug, warn};

use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::event::{EventEnvelope, StatusUpdate, TriggerRequest};
use pulsehub_domain::notification::{Notification, NotificationKind};
use pulsehub_domain::rule::DEVICE_ID_KEY;
use pulsehub_domain::time::now;

use crate::engine::AutomationEngine;
use crate::ports::{
    CommandPublisher, InboundEventSink, NotificationPublisher, RuleRepository,
};

/// Translates raw broker payloads and feeds the engine and the delivery bus.
pub struct Ingestor<R, C, P> {
    engine: AutomationEngine<R, C, P>,
    publisher: P,
}

impl<R, C, P> Ingestor<R, C, P>
where
    R: RuleRepository + Send + Sync,
    C: CommandPublisher + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    pub fn new(engine: AutomationEngine<R, C, P>, publisher: P) -> Self {
        Self { engine, publisher }
    }
}

impl<R, C, P> InboundEventSink for Ingestor<R, C, P>
where
    R: RuleRepository + Send + Sync,
    C: CommandPublisher + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    async fn ingest_event(&self, payload: &[u8]) -> Result<(), PulseHubError> {
        let envelope: EventEnvelope = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed event payload");
                return Ok(());
            }
        };
        let Some(kind) = NotificationKind::from_tag(&envelope.kind) else {
            warn!(kind = %envelope.kind, "dropping event with unknown type tag");
            return Ok(());
        };
        if !kind.is_system_wide() && envelope.user_id.is_none() {
            warn!(kind = %kind, "dropping targeted event without a user id");
            return Ok(());
        }

        // Device state changes are offered to the engine before delivery;
        // an engine failure leaves the message unacknowledged for retry.
        if kind == NotificationKind::DeviceStateChanged {
            if let (Some(user_id), Some(device_id), Some(state)) =
                (envelope.user_id, envelope.device_id, envelope.state())
            {
                let fired = self.engine.on_device_event(user_id, device_id, state).await?;
                if !fired.is_empty() {
                    debug!(user_id = %user_id, device_id = %device_id, rules = fired.len(), "device event fired rules");
                }
            }
        }

        self.publisher.publish(normalize(kind, &envelope)).await?;
        Ok(())
    }

    async fn ingest_status(&self, payload: &[u8]) -> Result<(), PulseHubError> {
        let status: StatusUpdate = match serde_json::from_slice(payload) {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "dropping malformed status payload");
                return Ok(());
            }
        };
        // A status update without an owner cannot be routed; broadcasting a
        // single user's device state to everyone would leak it.
        let Some(user_id) = status.user_id else {
            debug!(device_id = %status.device_id, "dropping status update without a user id");
            return Ok(());
        };

        let notification = Notification::builder(NotificationKind::DeviceStateChanged)
            .user(user_id)
            .message(format!("Device {} reported state", status.device_id))
            .data(serde_json::json!({
                "deviceId": status.device_id,
                "state": status.state,
            }))
            .build();
        self.publisher.publish(notification).await?;
        Ok(())
    }

    async fn ingest_trigger(&self, payload: &[u8]) -> Result<(), PulseHubError> {
        let request: TriggerRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "dropping malformed trigger payload");
                return Ok(());
            }
        };
        let fired = self
            .engine
            .on_trigger(request.user_id, request.trigger_type)
            .await?;
        debug!(
            user_id = %request.user_id,
            kind = %request.trigger_type,
            rules = fired.len(),
            "processed direct trigger request"
        );
        Ok(())
    }
}

/// Map a known event to its canonical notification.
fn normalize(kind: NotificationKind, envelope: &EventEnvelope) -> Notification {
    let mut data = envelope.payload.clone();
    if let Some(device_id) = envelope.device_id {
        data.insert(
            DEVICE_ID_KEY.to_string(),
            Value::from(device_id.as_i64()),
        );
    }

    let mut builder = Notification::builder(kind)
        .message(message_for(kind, envelope))
        .data(Value::Object(data))
        .timestamp(envelope.timestamp.unwrap_or_else(now));
    // System-wide kinds stay untargeted even when the producer set a user.
    if let Some(user_id) = envelope.user_id.filter(|_| !kind.is_system_wide()) {
        builder = builder.user(user_id);
    }
    builder.build()
}

/// Derive the human-readable message deterministically from type + payload.
fn message_for(kind: NotificationKind, envelope: &EventEnvelope) -> String {
    let name = envelope.payload.get("name").and_then(Value::as_str);
    match kind {
        NotificationKind::DeviceStateChanged => envelope.device_id.map_or_else(
            || "Device state changed".to_string(),
            |id| format!("Device {id} changed state"),
        ),
        NotificationKind::DeviceAdded => match (name, envelope.device_id) {
            (Some(name), _) => format!("Device '{name}' added"),
            (None, Some(id)) => format!("Device {id} added"),
            (None, None) => "New device added".to_string(),
        },
        NotificationKind::MotionDetected => envelope
            .payload
            .get("location")
            .and_then(Value::as_str)
            .map_or_else(
                || "Motion detected".to_string(),
                |location| format!("Motion detected in {location}"),
            ),
        NotificationKind::SecurityAlert => envelope
            .payload
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| "Security alert raised".to_string(), str::to_string),
        NotificationKind::AutomationExecuted => name.map_or_else(
            || "Automation executed".to_string(),
            |name| format!("Automation '{name}' executed"),
        ),
        NotificationKind::AutomationCreated => name.map_or_else(
            || "Automation created".to_string(),
            |name| format!("Automation '{name}' created"),
        ),
        NotificationKind::InventoryUpdated => envelope
            .payload
            .get("item")
            .and_then(Value::as_str)
            .map_or_else(
                || "Inventory updated".to_string(),
                |item| format!("Inventory updated for {item}"),
            ),
    }
}
