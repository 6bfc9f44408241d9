//! NMEA 2000 output sinks.
//!
//! Lines are Actisense-format, timestamp first. The TCP sink writes one
//! line per message terminated by CRLF, the way Actisense gateways take it.

use async_trait::async_trait;
use notification_acker::ports::outbound::Nmea2000Output;
use notification_acker::{AckerError, AckerResult};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::N2kOutputConfig;

/// Where `nmea2000out` lines go.
pub enum N2kSink {
    /// Log every line.
    Log,
    /// Write to a TCP gateway.
    Tcp(TcpSink),
}

impl N2kSink {
    #[must_use]
    pub fn from_config(config: &N2kOutputConfig) -> Self {
        match config {
            N2kOutputConfig::Log => Self::Log,
            N2kOutputConfig::Tcp { address } => Self::Tcp(TcpSink::new(address.clone())),
        }
    }
}

#[async_trait]
impl Nmea2000Output for N2kSink {
    async fn send(&self, line: String) -> AckerResult<()> {
        match self {
            Self::Log => {
                info!(target: "nmea2000out", line = %line, "NMEA 2000 out");
                Ok(())
            }
            Self::Tcp(sink) => sink.send(&line).await,
        }
    }
}

/// Lazily connected TCP output.
pub struct TcpSink {
    address: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpSink {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Write one line, connecting first if needed.
    ///
    /// A failed write drops the connection; the next send reconnects.
    ///
    /// # Errors
    ///
    /// `AckerError::Emission` when connecting or writing fails.
    pub async fn send(&self, line: &str) -> AckerResult<()> {
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            let stream = TcpStream::connect(&self.address)
                .await
                .map_err(|e| AckerError::emission(format!("connect {}: {e}", self.address)))?;
            debug!(address = %self.address, "Connected to NMEA 2000 gateway");
            *guard = Some(stream);
        }

        let Some(stream) = guard.as_mut() else {
            return Err(AckerError::emission("no gateway connection"));
        };
        let frame = format!("{line}\r\n");
        if let Err(e) = stream.write_all(frame.as_bytes()).await {
            warn!(address = %self.address, error = %e, "NMEA 2000 gateway write failed");
            *guard = None;
            return Err(AckerError::emission(e));
        }
        Ok(())
    }
}
