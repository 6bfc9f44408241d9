//! Signal K server connection and the acker ports bound to it.

pub mod client;
pub mod frames;
pub mod messages;
pub mod subscriptions;

pub use client::{backoff_delay, should_retry, ClientExit, ClientHandle, CommandId, SignalKClient};
pub use frames::{parse_frame, Hello, RequestReply, ServerFrame};
pub use messages::SignalKMessages;
pub use subscriptions::SignalKSubscriptions;
