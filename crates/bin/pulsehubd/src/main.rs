//! # pulsehubd — pulsehub daemon
//!
//! Composition root that wires all adapters together and starts the service.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Connect the queue broker publisher and the relay publisher (retrying
//!   forever — both are unowned shared infrastructure that may come up later)
//! - Construct the registry, fan-out, bus, engine, and ingestion multiplexer
//! - Spawn one task per external source: log consumer, queue consumer, relay
//!   subscriber, liveness timer, bus dispatch loop
//! - Bind the WebSocket listener and serve until shutdown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pulsehub_adapter_log_kafka::LogEventSource;
use pulsehub_adapter_queue_lapin::{LapinCommandPublisher, QueueConsumer};
use pulsehub_adapter_relay_redis::{RedisRelay, RelaySubscriber};
use pulsehub_adapter_storage_sqlite_sqlx::{Config as DbConfig, SqliteRuleRepository};
use pulsehub_adapter_ws_axum::{AppState, router};
use pulsehub_app::engine::AutomationEngine;
use pulsehub_app::event_bus::InProcessEventBus;
use pulsehub_app::fanout::DeliveryFanout;
use pulsehub_app::ingest::Ingestor;
use pulsehub_app::liveness::LivenessSupervisor;
use pulsehub_app::registry::SessionRegistry;
use pulsehub_domain::id::InstanceId;

use crate::config::Config;

/// Delay between retries while waiting for shared infrastructure at startup.
const STARTUP_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let instance = InstanceId::new();
    info!(instance = %instance, "starting pulsehubd");

    // Database
    let db = DbConfig {
        database_url: config.database.url.clone(),
    }
    .build()
    .await?;
    let rule_repo = Arc::new(SqliteRuleRepository::new(db.pool().clone()));

    // Shared infrastructure — retry until it is reachable.
    let relay = loop {
        match RedisRelay::connect(&config.relay_config()).await {
            Ok(relay) => break Arc::new(relay),
            Err(err) => {
                error!(error = %err, "relay connect failed, retrying");
                tokio::time::sleep(STARTUP_RETRY_DELAY).await;
            }
        }
    };
    let commands = loop {
        match LapinCommandPublisher::connect(&config.queue_config()).await {
            Ok(publisher) => break Arc::new(publisher),
            Err(err) => {
                error!(error = %err, "queue broker connect failed, retrying");
                tokio::time::sleep(STARTUP_RETRY_DELAY).await;
            }
        }
    };

    // Core services
    let registry = Arc::new(SessionRegistry::new());
    let fanout = Arc::new(DeliveryFanout::new(
        Arc::clone(&registry),
        Arc::clone(&relay),
        instance,
    ));
    let bus = Arc::new(InProcessEventBus::new(256));
    let engine = AutomationEngine::new(
        Arc::clone(&rule_repo),
        Arc::clone(&commands),
        Arc::clone(&bus),
        config.engine_config(),
    );
    let ingestor = Arc::new(Ingestor::new(engine, Arc::clone(&bus)));

    // Dispatch loop: bus → local sessions + relay.
    let dispatch_rx = bus.subscribe();
    let dispatch_fanout = Arc::clone(&fanout);
    tokio::spawn(async move { dispatch_fanout.run(dispatch_rx).await });

    // One task per external source.
    tokio::spawn(LogEventSource::new(config.log_config()).run(Arc::clone(&ingestor)));
    tokio::spawn(QueueConsumer::new(config.queue_config()).run(Arc::clone(&ingestor)));
    tokio::spawn(RelaySubscriber::new(config.relay_config()).run(Arc::clone(&fanout)));
    tokio::spawn(LivenessSupervisor::new(Arc::clone(&registry), config.liveness_interval()).run());

    // WebSocket listener
    let app = router::build(AppState::new(Arc::clone(&registry)));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "pulsehubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("pulsehubd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
