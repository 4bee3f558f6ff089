//! Notification — the canonical event record delivered to live sessions.
//!
//! Notifications are produced by the ingestion multiplexer (and by the
//! automation engine for `automation.executed`), are immutable once built,
//! and are discarded after delivery — there is no persistence.

use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::time::Timestamp;

/// Enumerates every event kind the system knows how to deliver.
///
/// The serialized form is the dotted wire tag (`"device.state_changed"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "device.state_changed")]
    DeviceStateChanged,
    #[serde(rename = "device.added")]
    DeviceAdded,
    #[serde(rename = "motion.detected")]
    MotionDetected,
    #[serde(rename = "security.alert")]
    SecurityAlert,
    #[serde(rename = "automation.executed")]
    AutomationExecuted,
    #[serde(rename = "automation.created")]
    AutomationCreated,
    #[serde(rename = "inventory.updated")]
    InventoryUpdated,
}

impl NotificationKind {
    /// Look up a kind from its raw wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "device.state_changed" => Some(Self::DeviceStateChanged),
            "device.added" => Some(Self::DeviceAdded),
            "motion.detected" => Some(Self::MotionDetected),
            "security.alert" => Some(Self::SecurityAlert),
            "automation.executed" => Some(Self::AutomationExecuted),
            "automation.created" => Some(Self::AutomationCreated),
            "inventory.updated" => Some(Self::InventoryUpdated),
            _ => None,
        }
    }

    /// The raw wire tag for this kind.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::DeviceStateChanged => "device.state_changed",
            Self::DeviceAdded => "device.added",
            Self::MotionDetected => "motion.detected",
            Self::SecurityAlert => "security.alert",
            Self::AutomationExecuted => "automation.executed",
            Self::AutomationCreated => "automation.created",
            Self::InventoryUpdated => "inventory.updated",
        }
    }

    /// Whether events of this kind address every user on every instance.
    #[must_use]
    pub fn is_system_wide(self) -> bool {
        matches!(self, Self::InventoryUpdated)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A canonical event record.
///
/// Serializes to the delivery wire shape:
/// `{type, userId?, message, data?, timestamp, broadcast?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Target user; absent means broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Human-readable summary derived deterministically from the event.
    pub message: String,
    /// Structured event payload, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub broadcast: bool,
}

impl Notification {
    /// Create a builder for constructing a [`Notification`].
    #[must_use]
    pub fn builder(kind: NotificationKind) -> NotificationBuilder {
        NotificationBuilder {
            kind,
            user_id: None,
            message: String::new(),
            data: serde_json::Value::Null,
            timestamp: None,
            broadcast: kind.is_system_wide(),
        }
    }
}

/// Step-by-step builder for [`Notification`].
#[derive(Debug)]
pub struct NotificationBuilder {
    kind: NotificationKind,
    user_id: Option<UserId>,
    message: String,
    data: serde_json::Value,
    timestamp: Option<Timestamp>,
    broadcast: bool,
}

impl NotificationBuilder {
    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts);
        self
    }

    #[must_use]
    pub fn broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Consume the builder and return the immutable [`Notification`].
    #[must_use]
    pub fn build(self) -> Notification {
        Notification {
            kind: self.kind,
            user_id: self.user_id,
            message: self.message,
            data: self.data,
            timestamp: self.timestamp.unwrap_or_else(crate::time::now),
            broadcast: self.broadcast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_every_kind_through_its_tag() {
        let kinds = [
            NotificationKind::DeviceStateChanged,
            NotificationKind::DeviceAdded,
            NotificationKind::MotionDetected,
            NotificationKind::SecurityAlert,
            NotificationKind::AutomationExecuted,
            NotificationKind::AutomationCreated,
            NotificationKind::InventoryUpdated,
        ];
        for kind in kinds {
            assert_eq!(NotificationKind::from_tag(kind.as_tag()), Some(kind));
        }
    }

    #[test]
    fn should_return_none_for_unknown_tag() {
        assert_eq!(NotificationKind::from_tag("vacuum.docked"), None);
    }

    #[test]
    fn should_mark_only_inventory_updates_system_wide() {
        assert!(NotificationKind::InventoryUpdated.is_system_wide());
        assert!(!NotificationKind::DeviceStateChanged.is_system_wide());
        assert!(!NotificationKind::SecurityAlert.is_system_wide());
    }

    #[test]
    fn should_serialize_to_delivery_wire_shape() {
        let n = Notification::builder(NotificationKind::DeviceStateChanged)
            .user(UserId::new(7))
            .message("Device 3 changed state")
            .data(serde_json::json!({"deviceId": 3, "state": {"on": true}}))
            .build();

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "device.state_changed");
        assert_eq!(value["userId"], 7);
        assert_eq!(value["message"], "Device 3 changed state");
        assert_eq!(value["data"]["state"]["on"], true);
        assert!(value.get("broadcast").is_none());
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn should_omit_user_id_for_broadcasts() {
        let n = Notification::builder(NotificationKind::InventoryUpdated)
            .message("Inventory updated")
            .build();

        assert!(n.broadcast);
        let value = serde_json::to_value(&n).unwrap();
        assert!(value.get("userId").is_none());
        assert_eq!(value["broadcast"], true);
    }

    #[test]
    fn should_roundtrip_notification_through_serde_json() {
        let n = Notification::builder(NotificationKind::MotionDetected)
            .user(UserId::new(12))
            .message("Motion detected")
            .data(serde_json::json!({"location": "hall"}))
            .build();

        let json = serde_json::to_string(&n).unwrap();
        let parsed: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, n);
    }
}
