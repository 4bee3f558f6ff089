//! # pulsehub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter — the engine's read/write access to stored
//! automation rules.
//!
//! ## Responsibilities
//! - Own the connection pool and run migrations
//! - Implement the [`RuleRepository`](pulsehub_app::ports::RuleRepository)
//!   port (`enabled_for_user`, `mark_executed`)
//! - Offer `create`/`get_by_id` for the external rule-management boundary
//!   and for tests
//!
//! ## Dependency rule
//! Depends on `pulsehub-app` and `pulsehub-domain`. Never on other adapters.

mod error;
mod pool;
mod rule_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_repo::SqliteRuleRepository;
