//! # pulsehub-domain
//!
//! Pure domain model for the pulsehub real-time notification and automation
//! service.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Notifications** (canonical event records delivered to sessions)
//! - Define **Automation Rules** (trigger conditions → device actions)
//! - Define **Device Commands** (the output of a fired rule)
//! - Define the **inbound event envelopes** both brokers deserialize into
//! - Define the **relay envelope** carried on the cross-instance channel
//! - Contain all invariant enforcement and matching logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod event;
pub mod notification;
pub mod relay;
pub mod rule;
