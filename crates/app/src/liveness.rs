//! Connection liveness supervisor — probes and reaps half-open connections.
//!
//! Duplex transports can go half-open; without active probing, stale registry
//! entries leak and notifications appear "delivered" into a black hole. On a
//! fixed interval the supervisor terminates every connection that never
//! answered the previous probe, then probes the rest and marks them as
//! awaiting an answer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ports::ConnectionTransport;
use crate::registry::SessionRegistry;

/// Outcome of one liveness pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Connections terminated for not answering the previous probe.
    pub reaped: usize,
    /// Connections sent a fresh probe.
    pub probed: usize,
}

/// Periodically sweeps the session registry for dead connections.
pub struct LivenessSupervisor<T> {
    registry: Arc<SessionRegistry<T>>,
    interval: Duration,
}

impl<T: ConnectionTransport> LivenessSupervisor<T> {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<T>>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run one pass: close the unanswered, probe the rest.
    pub fn sweep(&self) -> SweepStats {
        let sweep = self.registry.sweep_liveness();
        let stats = SweepStats {
            reaped: sweep.reaped.len(),
            probed: sweep.probe.len(),
        };

        // The registry entries are already gone; closing outside the critical
        // section lets in-flight deliveries fail as ordinary write errors.
        for transport in sweep.reaped {
            transport.close();
        }
        for transport in sweep.probe {
            if !transport.probe() {
                // Leave the awaiting flag set; the next sweep reaps it.
                warn!("liveness probe could not be sent");
            }
        }

        if stats.reaped > 0 {
            info!(reaped = stats.reaped, probed = stats.probed, "reaped dead connections");
        } else {
            debug!(probed = stats.probed, "liveness sweep complete");
        }
        stats
    }

    /// Sweep forever on the configured interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so connections get a full
        // interval to answer before the first reaping pass.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let _ = self.sweep();
        }
    }
}
