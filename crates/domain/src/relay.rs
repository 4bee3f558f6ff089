//! Relay envelope — what travels on the cross-instance pub/sub channel.

use serde::{Deserialize, Serialize};

use crate::id::InstanceId;
use crate::notification::Notification;

/// A notification tagged with the instance that first delivered it locally.
///
/// Receivers skip envelopes carrying their own `origin`: the originating
/// instance already wrote to its local connections when it published, so
/// acting on the echo would deliver twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub origin: InstanceId,
    pub notification: Notification,
}

impl RelayEnvelope {
    #[must_use]
    pub fn new(origin: InstanceId, notification: Notification) -> Self {
        Self {
            origin,
            notification,
        }
    }
}
