//! Automation trigger engine — matches events against stored rules and emits
//! device commands.
//!
//! Rules are fetched per evaluation; nothing is cached between events. A rule
//! is either enabled or disabled (stored flag, toggled externally); execution
//! is a transient code path, not a persisted state. Concurrent triggers for
//! the same rule are not serialized — they can race on the `last_executed`
//! write and double-enqueue commands. The configurable suppress window skips
//! rules that executed recently, which narrows but does not close that race.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use pulsehub_domain::command::DeviceCommand;
use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::id::{DeviceId, RuleId, UserId};
use pulsehub_domain::notification::{Notification, NotificationKind};
use pulsehub_domain::rule::{AutomationRule, TriggerKind};
use pulsehub_domain::time::now;

use crate::ports::{CommandPublisher, NotificationPublisher, RuleRepository};

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// When set, a rule is skipped if it last executed within this window.
    ///
    /// Redelivery from the at-least-once brokers re-evaluates and may
    /// re-trigger rules; leaving this unset preserves that behavior, setting
    /// it gives operators an idempotency knob.
    pub suppress_repeat: Option<std::time::Duration>,
}

/// Evaluates rules against incoming events and emits commands.
pub struct AutomationEngine<R, C, P> {
    rules: R,
    commands: C,
    publisher: P,
    config: EngineConfig,
}

impl<R, C, P> AutomationEngine<R, C, P>
where
    R: RuleRepository + Send + Sync,
    C: CommandPublisher + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    pub fn new(rules: R, commands: C, publisher: P, config: EngineConfig) -> Self {
        Self {
            rules,
            commands,
            publisher,
            config,
        }
    }

    /// Evaluate a device state-change against the user's `device` rules.
    ///
    /// A candidate fires when its condition map names the changed device and
    /// every remaining condition key equals the new state payload.
    ///
    /// # Errors
    ///
    /// Returns an error when rules cannot be loaded or a command cannot be
    /// published; commands already published are not rolled back.
    pub async fn on_device_event(
        &self,
        user_id: UserId,
        device_id: DeviceId,
        state: &Map<String, Value>,
    ) -> Result<Vec<RuleId>, PulseHubError> {
        let rules = self.rules.enabled_for_user(user_id, TriggerKind::Device).await?;
        let mut fired = Vec::new();
        for rule in &rules {
            if !rule.trigger.matches_device_state(device_id, state) {
                continue;
            }
            if self.recently_executed(rule) {
                debug!(rule_id = %rule.id, "rule inside suppress window, skipping");
                continue;
            }
            self.execute(rule).await?;
            fired.push(rule.id);
        }
        Ok(fired)
    }

    /// Execute the user's rules of the given kind without condition matching.
    ///
    /// Used for direct trigger messages (manual or scheduled) from the work
    /// queue, which carry no device state to compare against.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::on_device_event`].
    pub async fn on_trigger(
        &self,
        user_id: UserId,
        kind: TriggerKind,
    ) -> Result<Vec<RuleId>, PulseHubError> {
        let rules = self.rules.enabled_for_user(user_id, kind).await?;
        let mut fired = Vec::new();
        for rule in &rules {
            if self.recently_executed(rule) {
                debug!(rule_id = %rule.id, "rule inside suppress window, skipping");
                continue;
            }
            self.execute(rule).await?;
            fired.push(rule.id);
        }
        Ok(fired)
    }

    fn recently_executed(&self, rule: &AutomationRule) -> bool {
        let Some(window) = self.config.suppress_repeat else {
            return false;
        };
        let Some(last) = rule.last_executed else {
            return false;
        };
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        now() - last < window
    }

    /// Emit one command per action in list order, stamp the rule, and publish
    /// the `automation.executed` notification back into the delivery path.
    async fn execute(&self, rule: &AutomationRule) -> Result<(), PulseHubError> {
        for action in &rule.actions {
            let command = DeviceCommand::from_action(action, rule.id, now());
            self.commands.publish(command).await?;
        }

        // A failed timestamp write must not block the commands that are
        // already on the queue; at-least-once, non-atomic by design.
        if let Err(err) = self.rules.mark_executed(rule.id, now()).await {
            warn!(rule_id = %rule.id, error = %err, "failed to persist last-executed timestamp");
        }

        let notification = Notification::builder(NotificationKind::AutomationExecuted)
            .user(rule.user_id)
            .message(format!("Automation '{}' executed", rule.name))
            .data(serde_json::json!({
                "automationId": rule.id,
                "name": rule.name,
            }))
            .build();
        if let Err(err) = self.publisher.publish(notification).await {
            warn!(rule_id = %rule.id, error = %err, "failed to publish execution notification");
        }

        Ok(())
    }
}
