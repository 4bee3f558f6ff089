//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the core services and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod command_queue;
pub mod event_bus;
pub mod ingest;
pub mod relay;
pub mod rule_repo;
pub mod transport;

pub use command_queue::CommandPublisher;
pub use event_bus::NotificationPublisher;
pub use ingest::InboundEventSink;
pub use relay::RelayPublisher;
pub use rule_repo::RuleRepository;
pub use transport::ConnectionTransport;
