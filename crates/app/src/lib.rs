//! # pulsehub-app
//!
//! Application layer — core services and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RuleRepository` — read enabled rules, write back `last_executed`
//!   - `CommandPublisher` — enqueue device commands onto the queue broker
//!   - `RelayPublisher` — publish notifications to the cross-instance channel
//!   - `NotificationPublisher` — publish onto the in-process bus
//!   - `ConnectionTransport` — write/probe/close one duplex connection
//!   - `InboundEventSink` — the single inbound-event interface both broker
//!     adapters feed (driving/inbound port)
//! - Own the **session registry** (per-process user → connections map)
//! - Perform **delivery fan-out** (local writes + relay republish)
//! - **Normalize** heterogeneous broker payloads into canonical notifications
//! - Run the **automation trigger engine** and **liveness supervisor**
//! - Provide **in-process infrastructure** (notification bus) that needs no IO
//!
//! ## Dependency rule
//! Depends on `pulsehub-domain` only (plus `tokio::sync`/`tokio::time` for
//! channels and timers). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod engine;
pub mod event_bus;
pub mod fanout;
pub mod ingest;
pub mod liveness;
pub mod ports;
pub mod registry;
