//! Recording fakes for the outbound ports.

use std::sync::Arc;

use async_trait::async_trait;
use signalk_types::Delta;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{AckerError, AckerResult};
use crate::ports::outbound::{MessageHandler, Nmea2000Output};

/// Host that records every emission, optionally failing `handle_message`.
pub(crate) struct RecordingHost {
    messages: mpsc::UnboundedSender<(String, Delta, Instant)>,
    lines: mpsc::UnboundedSender<String>,
    fail_messages: bool,
}

/// Receiving side of a [`RecordingHost`].
pub(crate) struct Recorded {
    pub messages: mpsc::UnboundedReceiver<(String, Delta, Instant)>,
    pub lines: mpsc::UnboundedReceiver<String>,
}

fn host(fail_messages: bool) -> (Arc<RecordingHost>, Recorded) {
    let (messages_tx, messages) = mpsc::unbounded_channel();
    let (lines_tx, lines) = mpsc::unbounded_channel();
    (
        Arc::new(RecordingHost {
            messages: messages_tx,
            lines: lines_tx,
            fail_messages,
        }),
        Recorded { messages, lines },
    )
}

pub(crate) fn recording_host() -> (Arc<RecordingHost>, Recorded) {
    host(false)
}

pub(crate) fn failing_host() -> (Arc<RecordingHost>, Recorded) {
    host(true)
}

#[async_trait]
impl MessageHandler for RecordingHost {
    async fn handle_message(&self, source_id: &str, delta: Delta) -> AckerResult<()> {
        if self.fail_messages {
            return Err(AckerError::emission("host unavailable"));
        }
        self.messages
            .send((source_id.to_string(), delta, Instant::now()))
            .map_err(AckerError::emission)
    }
}

#[async_trait]
impl Nmea2000Output for RecordingHost {
    async fn send(&self, line: String) -> AckerResult<()> {
        self.lines.send(line).map_err(AckerError::emission)
    }
}
