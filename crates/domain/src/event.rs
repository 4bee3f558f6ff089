//! Inbound event shapes — what the broker adapters deserialize into.
//!
//! Both brokers carry JSON, but with different contracts: the log broker
//! publishes domain events under a dotted `type` tag, while the work queue
//! carries device status updates and direct automation trigger requests.
//! Everything downstream of the adapters sees only these envelopes.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::id::{DeviceId, RuleId, UserId};
use crate::rule::TriggerKind;
use crate::time::Timestamp;

/// A raw domain event from the log broker: `{type, userId, timestamp, ...}`.
///
/// Fields the envelope does not name explicitly are kept in `payload` and
/// passed through to the notification untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub device_id: Option<DeviceId>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl EventEnvelope {
    /// The `state` object of a device event, if present and an object.
    #[must_use]
    pub fn state(&self) -> Option<&Map<String, Value>> {
        self.payload.get("state").and_then(Value::as_object)
    }
}

/// A device status update from the work queue: `{deviceId, state, userId?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub device_id: DeviceId,
    pub state: Value,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// A direct automation trigger request from the work queue (manual or
/// scheduled): `{userId, triggerType, automationId?, data?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub user_id: UserId,
    pub trigger_type: TriggerKind,
    #[serde(default)]
    pub automation_id: Option<RuleId>,
    #[serde(default)]
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_event_envelope_and_keep_extra_payload() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "type": "device.state_changed",
            "userId": 7,
            "deviceId": 3,
            "state": {"on": true},
            "source": "zigbee"
        }))
        .unwrap();

        assert_eq!(envelope.kind, "device.state_changed");
        assert_eq!(envelope.user_id, Some(UserId::new(7)));
        assert_eq!(envelope.device_id, Some(DeviceId::new(3)));
        assert_eq!(envelope.state().unwrap()["on"], true);
        assert_eq!(envelope.payload["source"], "zigbee");
    }

    #[test]
    fn should_parse_envelope_without_optional_fields() {
        let envelope: EventEnvelope =
            serde_json::from_value(serde_json::json!({"type": "inventory.updated"})).unwrap();
        assert!(envelope.user_id.is_none());
        assert!(envelope.device_id.is_none());
        assert!(envelope.state().is_none());
    }

    #[test]
    fn should_return_none_when_state_is_not_an_object() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "type": "device.state_changed",
            "state": "on"
        }))
        .unwrap();
        assert!(envelope.state().is_none());
    }

    #[test]
    fn should_parse_status_update() {
        let status: StatusUpdate = serde_json::from_value(serde_json::json!({
            "deviceId": 3,
            "state": {"on": true},
            "userId": 7
        }))
        .unwrap();
        assert_eq!(status.device_id, DeviceId::new(3));
        assert_eq!(status.user_id, Some(UserId::new(7)));
    }

    #[test]
    fn should_parse_trigger_request_with_lowercase_kind() {
        let trigger: TriggerRequest = serde_json::from_value(serde_json::json!({
            "userId": 7,
            "triggerType": "time"
        }))
        .unwrap();
        assert_eq!(trigger.user_id, UserId::new(7));
        assert_eq!(trigger.trigger_type, TriggerKind::Time);
        assert!(trigger.automation_id.is_none());
        assert!(trigger.data.is_null());
    }

    #[test]
    fn should_reject_trigger_request_without_user() {
        let result: Result<TriggerRequest, _> =
            serde_json::from_value(serde_json::json!({"triggerType": "device"}));
        assert!(result.is_err());
    }
}
