//! `SQLite` implementation of [`RuleRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use pulsehub_app::ports::RuleRepository;
use pulsehub_domain::error::PulseHubError;
use pulsehub_domain::id::{RuleId, UserId};
use pulsehub_domain::rule::{AutomationRule, RuleAction, RuleTrigger, TriggerKind};
use pulsehub_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(AutomationRule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<AutomationRule> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let user_id: i64 = row.try_get("user_id")?;
        let name: String = row.try_get("name")?;
        let enabled: bool = row.try_get("enabled")?;
        let trigger_json: String = row.try_get("trigger_data")?;
        let actions_json: String = row.try_get("actions")?;
        let last_executed_str: Option<String> = row.try_get("last_executed")?;

        let id = RuleId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let trigger: RuleTrigger = serde_json::from_str(&trigger_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let actions: Vec<RuleAction> = serde_json::from_str(&actions_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let last_executed = last_executed_str
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.to_utc())
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            })
            .transpose()?;

        Ok(Self(AutomationRule {
            id,
            user_id: UserId::new(user_id),
            name,
            enabled,
            trigger,
            actions,
            last_executed,
        }))
    }
}

/// `SQLite`-backed rule repository.
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a rule. Used by the external rule-management boundary.
    ///
    /// # Errors
    ///
    /// Returns [`PulseHubError::Storage`] when the insert fails.
    pub async fn create(&self, rule: AutomationRule) -> Result<AutomationRule, PulseHubError> {
        let trigger_json = serde_json::to_string(&rule.trigger).map_err(StorageError::from)?;
        let actions_json = serde_json::to_string(&rule.actions).map_err(StorageError::from)?;
        let last_executed = rule.last_executed.map(|ts| ts.to_rfc3339());

        sqlx::query(
                "INSERT INTO rules (id, user_id, name, enabled, trigger_data, actions, last_executed) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rule.id.to_string())
            .bind(rule.user_id.as_i64())
            .bind(&rule.name)
            .bind(rule.enabled)
            .bind(&trigger_json)
            .bind(&actions_json)
            .bind(&last_executed)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rule)
    }

    /// Fetch one rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`PulseHubError::Storage`] when the query fails.
    pub async fn get_by_id(&self, id: RuleId) -> Result<Option<AutomationRule>, PulseHubError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }
}

impl RuleRepository for SqliteRuleRepository {
    async fn enabled_for_user(
        &self,
        user_id: UserId,
        kind: TriggerKind,
    ) -> Result<Vec<AutomationRule>, PulseHubError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM rules WHERE user_id = ? AND enabled = 1 ORDER BY name")
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        // The trigger kind lives inside the JSON column; filter after decode.
        Ok(rows
            .into_iter()
            .map(|w| w.0)
            .filter(|rule| rule.trigger.kind == kind)
            .collect())
    }

    async fn mark_executed(&self, id: RuleId, at: Timestamp) -> Result<(), PulseHubError> {
        sqlx::query("UPDATE rules SET last_executed = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
