//! Error types for the acker runtime

use std::path::PathBuf;

use notification_acker::AckerError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid JSON of the expected shape.
    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server URL is not a WebSocket URL.
    #[error("Server URL must start with ws:// or wss://, got {0}")]
    InvalidServerUrl(String),

    /// TCP output selected without an address.
    #[error("NMEA 2000 TCP output needs an address")]
    EmptyTcpAddress,

    /// Acknowledgements need a source identifier.
    #[error("Source id must not be empty")]
    EmptySourceId,
}

/// Signal K client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to the server failed.
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    /// The connection request could not be built.
    #[error("Invalid connection request: {reason}")]
    Request { reason: String },

    /// A frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(#[from] tungstenite::Error),

    /// An outbound command could not be serialized.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The client connection loop was started already.
    #[error("Client already started")]
    AlreadyStarted,

    /// The client connection loop has stopped.
    #[error("Client connection loop has stopped")]
    Closed,
}

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Acker(#[from] AckerError),
}
