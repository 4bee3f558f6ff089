//! Command queue port — publishing device commands onto the queue broker.

use std::future::Future;

use pulsehub_domain::command::DeviceCommand;
use pulsehub_domain::error::PulseHubError;

/// Publishes device commands for the external device-control boundary.
pub trait CommandPublisher {
    /// Enqueue one command onto the durable work queue.
    fn publish(
        &self,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), PulseHubError>> + Send {
        (**self).publish(command)
    }
}
