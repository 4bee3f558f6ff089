//! JSON frame shapes of the duplex client protocol.
//!
//! Delivered notifications are serialized straight from
//! [`Notification`](pulsehub_domain::notification::Notification); the frames
//! here cover the handshake and liveness exchanges.

use serde::{Deserialize, Serialize};

use pulsehub_domain::id::UserId;
use pulsehub_domain::time::{Timestamp, now};

/// Frames a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Handshake: binds the connection to a user.
    Authenticate {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// Application-level liveness check, independent of transport pings.
    Ping,
}

/// Frames the server sends in reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Authenticated { message: String, timestamp: Timestamp },
    Pong { timestamp: Timestamp },
    Error { message: String, timestamp: Timestamp },
}

impl ServerFrame {
    #[must_use]
    pub fn authenticated(user_id: UserId) -> Self {
        Self::Authenticated {
            message: format!("Authenticated as user {user_id}"),
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn pong() -> Self {
        Self::Pong { timestamp: now() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: now(),
        }
    }
}
