//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`PulseHubError`] at the port boundary. Connectivity failures carry their
//! library error as a boxed source so the domain stays free of IO crates.

/// Top-level error type crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum PulseHubError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The persistent store failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A durable broker (log or queue) failed.
    #[error("broker error")]
    Broker(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The cross-instance relay channel failed.
    #[error("relay error")]
    Relay(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An inbound payload could not be decoded.
    #[error("malformed payload")]
    Malformed(#[from] serde_json::Error),
}

/// Domain invariant violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A name field was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// A rule carried no actions.
    #[error("at least one action is required")]
    NoActions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_pulsehub_error() {
        let err: PulseHubError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            PulseHubError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_preserve_source_of_malformed_payload() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PulseHubError = json_err.into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
