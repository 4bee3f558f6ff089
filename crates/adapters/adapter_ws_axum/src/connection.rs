//! Per-connection lifecycle: upgrade, handshake, read/write loops.
//!
//! Each accepted socket splits into a reader driven here and a writer task
//! draining the connection's bounded outbound queue. The handshake state
//! machine is `Connected` (unauthenticated) → `Authenticated` → `Closed`;
//! pre-auth frames other than `authenticate` get an error reply without
//! tearing the connection down — only transport close or a liveness failure
//! does that.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pulsehub_app::ports::ConnectionTransport;
use pulsehub_domain::id::{ConnectionId, UserId};

use crate::protocol::{ClientFrame, ServerFrame};
use crate::state::AppState;
use crate::transport::{Outbound, WsTransport};

/// Upgrade handler for the `/ws` route.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    let (transport, outbound_rx) = WsTransport::channel();
    let transport = Arc::new(transport);
    state.registry.track(connection_id, Arc::clone(&transport));
    info!(connection_id = %connection_id, "connection accepted");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound_rx));

    read_loop(stream, &state, connection_id, &transport).await;

    // Terminal state: drop the registry entry first so in-flight deliveries
    // fail as ordinary write errors, then let the writer drain and stop.
    state.registry.unregister(connection_id);
    transport.close();
    let _ = writer.await;
    info!(connection_id = %connection_id, "connection closed");
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        let result = match item {
            Outbound::Frame(frame) => sink.send(Message::Text(frame.as_str().into())).await,
            Outbound::Probe => sink.send(Message::Ping(axum::body::Bytes::new())).await,
            Outbound::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        };
        if result.is_err() {
            // Write to a closed transport; the reader side ends the
            // connection, nothing to do here.
            break;
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    connection_id: ConnectionId,
    transport: &Arc<WsTransport>,
) {
    let mut authenticated: Option<UserId> = None;
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "transport error");
                break;
            }
        };
        match message {
            Message::Text(text) => handle_frame(
                text.as_str(),
                state,
                connection_id,
                &mut authenticated,
                transport,
            ),
            Message::Pong(_) => state.registry.record_pong(connection_id),
            // The underlying transport answers pings on its own.
            Message::Ping(_) => {}
            Message::Binary(payload) => {
                warn!(
                    connection_id = %connection_id,
                    len = payload.len(),
                    "unexpected binary frame"
                );
            }
            Message::Close(reason) => {
                debug!(connection_id = %connection_id, reason = ?reason, "close frame received");
                break;
            }
        }
    }
}

/// Handle one inbound JSON text frame against the handshake state machine.
fn handle_frame(
    text: &str,
    state: &AppState,
    connection_id: ConnectionId,
    authenticated: &mut Option<UserId>,
    transport: &Arc<WsTransport>,
) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(connection_id = %connection_id, error = %err, "malformed frame");
            reply(transport, &ServerFrame::error("Invalid JSON frame"));
            return;
        }
    };
    let Ok(frame) = serde_json::from_value::<ClientFrame>(value.clone()) else {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        warn!(connection_id = %connection_id, kind, "unsupported frame type");
        reply(transport, &ServerFrame::error(format!("Unknown message type: {kind}")));
        return;
    };

    match frame {
        ClientFrame::Authenticate { user_id } => {
            if authenticated.is_none() {
                *authenticated = Some(user_id);
                state.registry.register(connection_id, user_id);
                info!(connection_id = %connection_id, user_id = %user_id, "connection authenticated");
            } else {
                debug!(connection_id = %connection_id, "duplicate authenticate frame");
            }
            reply(transport, &ServerFrame::authenticated(user_id));
        }
        ClientFrame::Ping => {
            if authenticated.is_some() {
                reply(transport, &ServerFrame::pong());
            } else {
                reply(transport, &ServerFrame::error("Authentication required"));
            }
        }
    }
}

fn reply(transport: &Arc<WsTransport>, frame: &ServerFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if !transport.send(Arc::new(json)) {
                debug!("reply dropped, connection backlog full or closed");
            }
        }
        Err(err) => warn!(error = %err, "failed to serialize reply frame"),
    }
}
