//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The host bus as seen by the acker: a subscription manager, a message
//! handler accepting deltas, and the NMEA 2000 output channel.

use async_trait::async_trait;
use signalk_bus::{DeltaStream, SubscriptionError, SubscriptionHandle};
use signalk_types::{Delta, SubscribeCommand};

use crate::error::AckerResult;

/// Opens filtered delta subscriptions.
#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    /// Subscribe with `command`.
    ///
    /// The stream delivers deltas in bus order and `Err` items for failures
    /// after the subscription was opened. Releasing the handle closes the
    /// subscription.
    async fn subscribe(
        &self,
        command: SubscribeCommand,
    ) -> Result<(SubscriptionHandle, DeltaStream), SubscriptionError>;
}

/// The host's message-handling entry point.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Hand a delta to the host on behalf of `source_id`.
    async fn handle_message(&self, source_id: &str, delta: Delta) -> AckerResult<()>;
}

/// The `nmea2000out` channel.
#[async_trait]
pub trait Nmea2000Output: Send + Sync {
    /// Send one timestamped Actisense-format line.
    async fn send(&self, line: String) -> AckerResult<()>;
}
