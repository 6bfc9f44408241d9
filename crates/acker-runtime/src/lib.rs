//! # Acker Runtime
//!
//! Runs the notification acker as a standalone process against a Signal K
//! server.
//!
//! ```text
//! Signal K server ══WebSocket══ SignalKClient ──publish──→ DeltaBus
//!        ↑                          ↑                          │
//!        │ ack deltas               │ subscribe/unsubscribe    │ filtered deltas
//!        │                          │                          ↓
//!        └──── SignalKMessages ←─── NotificationAcker ←── SignalKSubscriptions
//!                                         │
//!                                         └──→ N2kSink (log | TCP gateway)
//! ```
//!
//! ## Modules
//!
//! - `config` - Layered runtime configuration and plugin rule loading
//! - `signalk` - Server connection and the ports bound to it
//! - `n2k` - NMEA 2000 output sinks
//! - `runtime` - Startup, reload and shutdown

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod n2k;
pub mod runtime;
pub mod signalk;
pub mod signals;

pub use config::{load_plugin_config, parse_plugin_config, N2kOutputConfig, ReconnectConfig, RuntimeConfig, ServerConfig};
pub use error::{ClientError, ConfigError, RuntimeError};
pub use n2k::{N2kSink, TcpSink};
pub use runtime::AckerRuntime;
pub use signals::Hangup;
pub use signalk::ClientExit;
