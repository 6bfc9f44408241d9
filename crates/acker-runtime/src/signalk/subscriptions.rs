//! Server-backed subscription manager.
//!
//! A subscription opens a filtered subscription on the local bus, which the
//! client feeds, and registers the command with the server connection.
//! Releasing the handle unsubscribes on the server and drops the local one.

use std::sync::Arc;

use async_trait::async_trait;
use notification_acker::ports::outbound::SubscriptionManager;
use signalk_bus::{DeltaBus, DeltaStream, SubscriptionError, SubscriptionHandle};
use signalk_types::SubscribeCommand;
use tracing::debug;

use super::client::ClientHandle;

/// Implements `SubscriptionManager` over a Signal K server connection.
pub struct SignalKSubscriptions {
    client: ClientHandle,
    bus: Arc<DeltaBus>,
}

impl SignalKSubscriptions {
    pub fn new(client: ClientHandle, bus: Arc<DeltaBus>) -> Self {
        Self { client, bus }
    }
}

#[async_trait]
impl SubscriptionManager for SignalKSubscriptions {
    async fn subscribe(
        &self,
        command: SubscribeCommand,
    ) -> Result<(SubscriptionHandle, DeltaStream), SubscriptionError> {
        let (local, stream) = self.bus.subscribe(command.clone())?.into_parts();
        let path = local.path().to_string();

        let id = self
            .client
            .subscribe(command)
            .map_err(|e| SubscriptionError::Transport { reason: e.to_string() })?;
        debug!(id, path = %path, "Registered server subscription");

        let client = self.client.clone();
        let handle = SubscriptionHandle::new(path, move || {
            client.unsubscribe(id);
            local.unsubscribe();
        });
        Ok((handle, stream))
    }
}
