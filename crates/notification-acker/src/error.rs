//! Error types for the notification acker

use signalk_bus::SubscriptionError;
use thiserror::Error;

/// Notification acker errors
#[derive(Debug, Error)]
pub enum AckerError {
    /// `start` was called while a cycle is running
    #[error("Acker already running - stop it before starting again")]
    AlreadyRunning,

    /// A subscription could not be opened
    #[error("Subscription to {path} failed: {source}")]
    Subscription {
        path: String,
        #[source]
        source: SubscriptionError,
    },

    /// An outbound emitter failed
    #[error("Emission failed: {reason}")]
    Emission { reason: String },

    /// Configuration could not be decoded
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl AckerError {
    /// Shorthand for an emission failure.
    pub fn emission(reason: impl std::fmt::Display) -> Self {
        Self::Emission {
            reason: reason.to_string(),
        }
    }
}

/// Result type for acker operations
pub type AckerResult<T> = Result<T, AckerError>;
