//! # pulsehub-adapter-ws-axum
//!
//! WebSocket adapter — the duplex boundary between end-user clients and the
//! session registry.
//!
//! ## Responsibilities
//! - Upgrade HTTP requests to WebSocket connections
//! - Drive the per-connection handshake state machine
//!   (`Connected → Authenticated → Closed`)
//! - Answer the JSON liveness ping and relay transport-level pongs to the
//!   registry
//! - Own the bounded outbound backlog per connection and expose it through
//!   the [`ConnectionTransport`](pulsehub_app::ports::ConnectionTransport) port
//! - Serve `/health` and `/stats`
//!
//! ## Dependency rule
//! Depends on `pulsehub-app` and `pulsehub-domain`. Never on other adapters.

pub mod connection;
pub mod protocol;
pub mod router;
pub mod state;
pub mod transport;

pub use state::AppState;
