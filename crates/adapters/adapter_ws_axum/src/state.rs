//! Shared state injected into the WebSocket router.

use std::sync::Arc;

use pulsehub_app::registry::SessionRegistry;

use crate::transport::WsTransport;

/// Handles the router needs: the process-local session registry.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry<WsTransport>>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<WsTransport>>) -> Self {
        Self { registry }
    }
}
