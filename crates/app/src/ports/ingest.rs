//! Inbound event sink port — the single interface both broker adapters feed.
//!
//! The log broker and the work queue use unrelated client libraries with
//! unrelated callback shapes; everything behind this trait sees only the
//! unified envelopes from `pulsehub-domain::event`.
//!
//! Contract for all three methods: `Ok(())` means the message was fully
//! processed *or* deliberately dropped (malformed / unknown shape — logged,
//! never fatal) and may be acknowledged. `Err` means transient failure; the
//! caller must not acknowledge, so the broker redelivers.

use std::future::Future;

use pulsehub_domain::error::PulseHubError;

/// Receives raw payloads from the broker consumer loops.
pub trait InboundEventSink: Send + Sync {
    /// A domain event from the log broker (`{type, userId, timestamp, ...}`).
    fn ingest_event(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;

    /// A device status update from the work queue.
    fn ingest_status(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;

    /// A direct automation trigger request from the work queue.
    fn ingest_trigger(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;
}

impl<T: InboundEventSink + Send + Sync> InboundEventSink for std::sync::Arc<T> {
    fn ingest_event(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).ingest_event(payload)
    }

    fn ingest_status(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).ingest_status(payload)
    }

    fn ingest_trigger(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).ingest_trigger(payload)
    }
}
