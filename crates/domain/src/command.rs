//! Device command — the output of a fired automation rule.
//!
//! Commands are published onto the queue broker and consumed by the external
//! device-control boundary; this system never executes them itself.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, RuleId};
use crate::rule::RuleAction;
use crate::time::Timestamp;

/// A desired state change for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub device_id: DeviceId,
    pub state: serde_json::Value,
    /// The rule that produced this command, when one did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<RuleId>,
    pub timestamp: Timestamp,
}

impl DeviceCommand {
    /// Build the command a rule action translates into.
    #[must_use]
    pub fn from_action(action: &RuleAction, automation_id: RuleId, timestamp: Timestamp) -> Self {
        Self {
            device_id: action.device_id,
            state: action.state.clone(),
            automation_id: Some(automation_id),
            timestamp,
        }
    }
}
