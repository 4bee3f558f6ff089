//! The write side of one WebSocket connection.
//!
//! Each connection owns a bounded in-memory outbound queue drained by its
//! writer task. All port operations are non-blocking `try_send`s: a full
//! backlog or a finished writer surfaces as a failed write, never as a stall
//! inside the registry's critical section.

use std::sync::Arc;

use tokio::sync::mpsc;

use pulsehub_app::ports::ConnectionTransport;

/// Fixed per-connection outbound backlog. Messages beyond this are dropped;
/// durable client-side queuing across reconnects is explicitly out of scope.
pub const OUTBOUND_BACKLOG: usize = 64;

/// What the writer task is asked to put on the wire.
#[derive(Debug)]
pub enum Outbound {
    /// One serialized JSON text frame.
    Frame(Arc<String>),
    /// A transport-level ping probe.
    Probe,
    /// Send a close frame and stop writing.
    Close,
}

/// Handle implementing the transport port for one connection.
pub struct WsTransport {
    outbound: mpsc::Sender<Outbound>,
}

impl WsTransport {
    /// Create the transport handle and the receiver for its writer task.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = mpsc::channel(OUTBOUND_BACKLOG);
        (Self { outbound }, rx)
    }
}

impl ConnectionTransport for WsTransport {
    fn send(&self, frame: Arc<String>) -> bool {
        self.outbound.try_send(Outbound::Frame(frame)).is_ok()
    }

    fn probe(&self) -> bool {
        self.outbound.try_send(Outbound::Probe).is_ok()
    }

    fn close(&self) {
        let _ = self.outbound.try_send(Outbound::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_enqueue_frame_for_writer() {
        let (transport, mut rx) = WsTransport::channel();
        assert!(transport.send(Arc::new("{}".to_string())));
        assert!(matches!(rx.recv().await, Some(Outbound::Frame(_))));
    }

    #[tokio::test]
    async fn should_fail_send_when_writer_is_gone() {
        let (transport, rx) = WsTransport::channel();
        drop(rx);
        assert!(!transport.send(Arc::new("{}".to_string())));
        assert!(!transport.probe());
    }

    #[tokio::test]
    async fn should_fail_send_when_backlog_is_full() {
        let (transport, _rx) = WsTransport::channel();
        for _ in 0..OUTBOUND_BACKLOG {
            assert!(transport.send(Arc::new("{}".to_string())));
        }
        assert!(!transport.send(Arc::new("{}".to_string())));
    }
}
