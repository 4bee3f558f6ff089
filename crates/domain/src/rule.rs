//! Automation rule — trigger conditions → device actions, owned by a user.
//!
//! Rules are created and edited through an external management boundary;
//! this system only reads enabled rules, matches them against events, and
//! writes back the `last_executed` timestamp.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PulseHubError, ValidationError};
use crate::id::{DeviceId, RuleId, UserId};
use crate::time::Timestamp;

/// Key in a device trigger's condition map naming the watched device.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// What class of stimulus activates a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Time,
    Device,
    Sensor,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => f.write_str("time"),
            Self::Device => f.write_str("device"),
            Self::Sensor => f.write_str("sensor"),
        }
    }
}

/// The trigger specification of a rule: kind plus a flat condition map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default)]
    pub conditions: Map<String, Value>,
}

impl RuleTrigger {
    /// Check this trigger against a device state-change.
    ///
    /// Matches when the trigger kind is `device`, the condition map names the
    /// changed device, and every remaining condition key equals the
    /// corresponding key of the new state payload. An empty condition map
    /// never matches.
    #[must_use]
    pub fn matches_device_state(&self, device_id: DeviceId, state: &Map<String, Value>) -> bool {
        if self.kind != TriggerKind::Device {
            return false;
        }
        if self.conditions.is_empty() {
            return false;
        }
        let watched = self.conditions.get(DEVICE_ID_KEY).and_then(Value::as_i64);
        if watched != Some(device_id.as_i64()) {
            return false;
        }
        self.conditions
            .iter()
            .filter(|(key, _)| key.as_str() != DEVICE_ID_KEY)
            .all(|(key, expected)| state.get(key) == Some(expected))
    }
}

impl std::fmt::Display for RuleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} conditions)", self.kind, self.conditions.len())
    }
}

/// One desired device state, applied when the owning rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    pub device_id: DeviceId,
    pub state: Value,
}

/// A stored automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub user_id: UserId,
    pub name: String,
    pub enabled: bool,
    pub trigger: RuleTrigger,
    pub actions: Vec<RuleAction>,
    pub last_executed: Option<Timestamp>,
}

impl AutomationRule {
    /// Create a builder for constructing an [`AutomationRule`].
    #[must_use]
    pub fn builder() -> AutomationRuleBuilder {
        AutomationRuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PulseHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `actions` is empty ([`ValidationError::NoActions`])
    pub fn validate(&self) -> Result<(), PulseHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`AutomationRule`].
#[derive(Debug, Default)]
pub struct AutomationRuleBuilder {
    id: Option<RuleId>,
    user_id: Option<UserId>,
    name: Option<String>,
    enabled: Option<bool>,
    trigger: Option<RuleTrigger>,
    actions: Vec<RuleAction>,
    last_executed: Option<Timestamp>,
}

impl AutomationRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: RuleTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn last_executed(mut self, ts: Timestamp) -> Self {
        self.last_executed = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationRule`].
    ///
    /// # Errors
    ///
    /// Returns [`PulseHubError::Validation`] if required fields are missing
    /// or empty.
    pub fn build(self) -> Result<AutomationRule, PulseHubError> {
        let rule = AutomationRule {
            id: self.id.unwrap_or_default(),
            user_id: self.user_id.unwrap_or(UserId::new(0)),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            trigger: self.trigger.unwrap_or(RuleTrigger {
                kind: TriggerKind::Device,
                conditions: Map::new(),
            }),
            actions: self.actions,
            last_executed: self.last_executed,
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_trigger(conditions: Value) -> RuleTrigger {
        RuleTrigger {
            kind: TriggerKind::Device,
            conditions: conditions.as_object().cloned().unwrap_or_default(),
        }
    }

    fn valid_action() -> RuleAction {
        RuleAction {
            device_id: DeviceId::new(9),
            state: serde_json::json!({"on": true}),
        }
    }

    fn state(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ── Builder & validation ───────────────────────────────────────

    #[test]
    fn should_build_valid_rule_when_required_fields_provided() {
        let rule = AutomationRule::builder()
            .user(UserId::new(7))
            .name("Hall light follows motion")
            .trigger(device_trigger(serde_json::json!({"deviceId": 3, "on": true})))
            .action(valid_action())
            .build()
            .unwrap();

        assert!(rule.enabled);
        assert!(rule.last_executed.is_none());
        assert_eq!(rule.actions.len(), 1);
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = AutomationRule::builder().action(valid_action()).build();
        assert!(matches!(
            result,
            Err(PulseHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_return_validation_error_when_actions_is_empty() {
        let result = AutomationRule::builder().name("No actions").build();
        assert!(matches!(
            result,
            Err(PulseHubError::Validation(ValidationError::NoActions))
        ));
    }

    #[test]
    fn should_default_to_enabled_when_not_specified() {
        let rule = AutomationRule::builder()
            .name("Default enabled")
            .action(valid_action())
            .build()
            .unwrap();
        assert!(rule.enabled);
    }

    // ── Device-state matching ──────────────────────────────────────

    #[test]
    fn should_match_when_device_and_all_condition_keys_match() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3, "on": true}));
        assert!(trigger.matches_device_state(DeviceId::new(3), &state(serde_json::json!({"on": true}))));
    }

    #[test]
    fn should_not_match_when_condition_value_differs() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3, "on": true}));
        assert!(!trigger.matches_device_state(DeviceId::new(3), &state(serde_json::json!({"on": false}))));
    }

    #[test]
    fn should_not_match_when_state_is_missing_the_condition_key() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3, "on": true}));
        assert!(
            !trigger.matches_device_state(
                DeviceId::new(3),
                &state(serde_json::json!({"brightness": 80}))
            )
        );
    }

    #[test]
    fn should_never_match_with_empty_condition_map() {
        let trigger = device_trigger(serde_json::json!({}));
        assert!(!trigger.matches_device_state(DeviceId::new(3), &state(serde_json::json!({"on": true}))));
    }

    #[test]
    fn should_not_match_a_different_device() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3, "on": true}));
        assert!(!trigger.matches_device_state(DeviceId::new(4), &state(serde_json::json!({"on": true}))));
    }

    #[test]
    fn should_not_match_when_trigger_kind_is_not_device() {
        let trigger = RuleTrigger {
            kind: TriggerKind::Sensor,
            conditions: state(serde_json::json!({"deviceId": 3, "on": true})),
        };
        assert!(!trigger.matches_device_state(DeviceId::new(3), &state(serde_json::json!({"on": true}))));
    }

    #[test]
    fn should_match_any_state_when_only_device_id_is_conditioned() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3}));
        assert!(trigger.matches_device_state(DeviceId::new(3), &state(serde_json::json!({"on": false}))));
    }

    #[test]
    fn should_compare_non_boolean_condition_values() {
        let trigger = device_trigger(serde_json::json!({"deviceId": 3, "brightness": 80}));
        assert!(trigger.matches_device_state(
            DeviceId::new(3),
            &state(serde_json::json!({"on": true, "brightness": 80}))
        ));
        assert!(!trigger.matches_device_state(
            DeviceId::new(3),
            &state(serde_json::json!({"on": true, "brightness": 40}))
        ));
    }

    // ── Serde ──────────────────────────────────────────────────────

    #[test]
    fn should_roundtrip_rule_through_serde_json() {
        let rule = AutomationRule::builder()
            .user(UserId::new(7))
            .name("Roundtrip")
            .trigger(device_trigger(serde_json::json!({"deviceId": 3, "on": true})))
            .action(valid_action())
            .build()
            .unwrap();

        let json = serde_json::to_string(&rule).unwrap();
        let parsed: AutomationRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn should_deserialize_trigger_kind_from_lowercase_tag() {
        let trigger: RuleTrigger =
            serde_json::from_value(serde_json::json!({"type": "device", "conditions": {}}))
                .unwrap();
        assert_eq!(trigger.kind, TriggerKind::Device);
    }

    #[test]
    fn should_serialize_action_with_camel_case_device_id() {
        let value = serde_json::to_value(valid_action()).unwrap();
        assert_eq!(value["deviceId"], 9);
        assert_eq!(value["state"]["on"], true);
    }
}
