//! Rule repository port — read access to stored automation rules.
//!
//! Rule CRUD belongs to an external management boundary; the engine only
//! reads enabled rules per evaluation and writes back the last-executed
//! timestamp. Rules are never cached across evaluations.

use std::future::Future;

use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::id::{RuleId, UserId};
use pulsehub_domain::rule::{AutomationRule, TriggerKind};
use pulsehub_domain::time::Timestamp;

/// Persistence access for [`AutomationRule`]s.
pub trait RuleRepository {
    /// Fetch the enabled rules of one user with the given trigger kind.
    fn enabled_for_user(
        &self,
        user_id: UserId,
        kind: TriggerKind,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, PulseHubError>> + Send;

    /// Record that a rule fired at the given instant.
    fn mark_executed(
        &self,
        id: RuleId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;
}

impl<T: RuleRepository + Send + Sync> RuleRepository for std::sync::Arc<T> {
    fn enabled_for_user(
        &self,
        user_id: UserId,
        kind: TriggerKind,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, PulseHubError>> + Send {
        (**self).enabled_for_user(user_id, kind)
    }

    fn mark_executed(
        &self,
        id: RuleId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).mark_executed(id, at)
    }
}
