//! Connection transport port — the write side of one duplex connection.
//!
//! All three operations are synchronous and must not block: `send` enqueues
//! onto a bounded in-memory backlog owned by the connection's writer task,
//! and reports failure instead of waiting. A `false` return is a
//! connection-scoped write failure, never a process-level error.

use std::sync::Arc;

/// Write/probe/close handle for one live duplex connection.
pub trait ConnectionTransport: Send + Sync + 'static {
    /// Enqueue one serialized frame for delivery.
    ///
    /// Returns `false` when the connection is closed or its backlog is full.
    fn send(&self, frame: Arc<String>) -> bool;

    /// Send a transport-level liveness probe.
    ///
    /// Returns `false` when the probe could not be enqueued.
    fn probe(&self) -> bool;

    /// Ask the connection to close. Idempotent.
    fn close(&self);
}
