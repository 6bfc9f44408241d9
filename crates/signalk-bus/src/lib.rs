//! # Signal K Bus - In-Process Delta Fan-Out
//!
//! Carries deltas from whoever feeds the bus (a server connection, a test)
//! to any number of filtered subscribers.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe(command)  ┌─────────────┐
//! │ Delta source │ ────────────→ │   DeltaBus   │ ───────────────────→ │ Subscriber  │
//! └──────────────┘               │              │   (path + context    └─────────────┘
//!                                │  messages()  │    filtered deltas)
//!        handle_message() ─────→ │  events()    │
//!        emit(event, payload) ─→ └──────────────┘
//! ```
//!
//! - Every subscriber sees only the values whose path matches its command.
//! - Dropping a subscription, or releasing its [`SubscriptionHandle`],
//!   untracks it.
//! - Messages handed to [`DeltaBus::handle_message`] are recorded and
//!   republished as deltas, the way a Signal K server routes plugin output.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod filter;
pub mod handle;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use filter::{DeltaFilter, PathPattern};
pub use handle::SubscriptionHandle;
pub use publisher::{AppEvent, DeltaBus, InboundMessage};
pub use subscriber::{DeltaStream, DeltaSubscription, SubscriptionError};

/// Maximum deltas to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
