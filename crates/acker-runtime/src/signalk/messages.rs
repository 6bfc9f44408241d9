//! Server-backed message handler.

use async_trait::async_trait;
use notification_acker::ports::outbound::MessageHandler;
use notification_acker::{AckerError, AckerResult};
use signalk_types::{Delta, SELF_CONTEXT};
use tracing::debug;

use super::client::ClientHandle;

/// Implements `MessageHandler` by sending deltas to the server.
pub struct SignalKMessages {
    client: ClientHandle,
}

impl SignalKMessages {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageHandler for SignalKMessages {
    async fn handle_message(&self, source_id: &str, delta: Delta) -> AckerResult<()> {
        let delta = if delta.context.is_some() {
            delta
        } else {
            delta.with_context(SELF_CONTEXT)
        };
        debug!(source = source_id, "Queueing delta for server");
        self.client.send_delta(delta).map_err(AckerError::emission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::signalk::client::{Outbound, SignalKClient};
    use serde_json::json;
    use signalk_bus::DeltaBus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stopped_client_is_emission_error() {
        let client = SignalKClient::new(ServerConfig::default(), Arc::new(DeltaBus::new()));
        let messages = SignalKMessages::new(client.handle());
        drop(client);

        let result = messages
            .handle_message("acker", Delta::single("mob", json!({"state": "alarm"})))
            .await;
        assert!(matches!(result, Err(AckerError::Emission { .. })));
    }

    #[tokio::test]
    async fn test_queued_while_disconnected() {
        let client = SignalKClient::new(ServerConfig::default(), Arc::new(DeltaBus::new()));
        let mut outbound = client.take_outbound().unwrap();
        let messages = SignalKMessages::new(client.handle());

        // Not connected yet; the delta waits in the queue
        messages
            .handle_message("acker", Delta::single("mob", json!({"state": "alarm", "method": []})))
            .await
            .unwrap();

        let Outbound::Delta(delta) = outbound.try_recv().unwrap() else {
            panic!("expected a queued delta");
        };
        assert_eq!(delta.context.as_deref(), Some(SELF_CONTEXT));
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({"context": "vessels.self", "updates": [{"values": [{"path": "mob", "value": {"state": "alarm", "method": []}}]}]})
        );
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_explicit_context_is_kept() {
        let client = SignalKClient::new(ServerConfig::default(), Arc::new(DeltaBus::new()));
        let mut outbound = client.take_outbound().unwrap();
        let messages = SignalKMessages::new(client.handle());

        let delta = Delta::single("mob", json!({"state": "alarm"})).with_context("vessels.urn:mrn:imo:mmsi:230099999");
        messages.handle_message("acker", delta).await.unwrap();

        let Outbound::Delta(delta) = outbound.try_recv().unwrap() else {
            panic!("expected a queued delta");
        };
        assert_eq!(delta.context.as_deref(), Some("vessels.urn:mrn:imo:mmsi:230099999"));
    }
}
