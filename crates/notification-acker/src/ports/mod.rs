//! Ports (Hexagonal Architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::{AckerApi, AckerStatus, LifecyclePhase, StartReport, StopReport};
pub use outbound::{MessageHandler, Nmea2000Output, SubscriptionManager};
