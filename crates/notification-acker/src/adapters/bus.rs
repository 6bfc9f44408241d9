//! Delta Bus Adapter
//!
//! Implements `SubscriptionManager`, `MessageHandler` and `Nmea2000Output`
//! using the in-process [`DeltaBus`], the way a Signal K server exposes its
//! bus to plugins.

use std::sync::Arc;

use async_trait::async_trait;
use signalk_bus::{DeltaBus, DeltaStream, SubscriptionError, SubscriptionHandle};
use signalk_types::{Delta, SubscribeCommand, NMEA2000_OUT_EVENT};
use tracing::debug;

use crate::error::AckerResult;
use crate::ports::outbound::{MessageHandler, Nmea2000Output, SubscriptionManager};

/// Host adapter over a shared [`DeltaBus`].
#[derive(Clone)]
pub struct DeltaBusAdapter {
    bus: Arc<DeltaBus>,
}

impl DeltaBusAdapter {
    /// Create a new adapter with the given bus.
    pub fn new(bus: Arc<DeltaBus>) -> Self {
        Self { bus }
    }

    /// The underlying bus.
    #[must_use]
    pub fn bus(&self) -> &Arc<DeltaBus> {
        &self.bus
    }
}

#[async_trait]
impl SubscriptionManager for DeltaBusAdapter {
    async fn subscribe(
        &self,
        command: SubscribeCommand,
    ) -> Result<(SubscriptionHandle, DeltaStream), SubscriptionError> {
        let subscription = self.bus.subscribe(command)?;
        Ok(subscription.into_parts())
    }
}

#[async_trait]
impl MessageHandler for DeltaBusAdapter {
    async fn handle_message(&self, source_id: &str, delta: Delta) -> AckerResult<()> {
        let receivers = self.bus.handle_message(source_id, delta);
        if receivers == 0 {
            debug!(source = source_id, "No subscribers for acknowledgement delta");
        }
        Ok(())
    }
}

#[async_trait]
impl Nmea2000Output for DeltaBusAdapter {
    async fn send(&self, line: String) -> AckerResult<()> {
        // Zero listeners is logged by the bus; the line is simply lost.
        self.bus.emit(NMEA2000_OUT_EVENT, line);
        Ok(())
    }
}
