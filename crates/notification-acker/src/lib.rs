//! # notification-acker
//!
//! Automatic acknowledgement of Signal K notifications.
//!
//! ## Overview
//!
//! For every enabled rule the acker subscribes to `notifications.<path>`,
//! and when a value in a matching state arrives it waits the rule's delay,
//! then sends a copy of the notification with `method` cleared (silencing
//! the alarm) and optionally a list of NMEA 2000 messages.
//!
//! ## Architecture
//!
//! ```text
//! start(config) ──→ Rule Set ──→ SubscriptionManager (one per rule)
//!                                     │ deltas
//!                                     ↓
//!                               router ──→ match engine ──→ ActionScheduler
//!                                                              │ after delay
//!                                          MessageHandler ←────┤
//!                                          Nmea2000Output ←────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! [STOPPED] ──start──→ [RUNNING] ──stop──→ [STOPPED]
//! ```
//!
//! Stop releases every subscription and, unless configured otherwise,
//! cancels acknowledgements that have not fired yet.
//!
//! ## Example
//!
//! ```rust,ignore
//! use notification_acker::adapters::DeltaBusAdapter;
//! use notification_acker::ports::inbound::AckerApi;
//! use notification_acker::{AckerConfig, AckerSettings, NotificationAcker};
//!
//! let host = Arc::new(DeltaBusAdapter::new(bus));
//! let acker = NotificationAcker::new(AckerSettings::default(), host.clone(), host.clone(), host);
//!
//! acker.start(&AckerConfig::from_json(text)?).await?;
//! // ...
//! acker.stop().await;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod ports;
pub mod router;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::{AckerConfig, AckerSettings, NotificationConfig};
pub use domain::{Rule, RuleState};
pub use error::{AckerError, AckerResult};
pub use metadata::{config_schema, PLUGIN_DESCRIPTION, PLUGIN_ID, PLUGIN_NAME};
pub use ports::{AckerApi, AckerStatus, LifecyclePhase, StartReport, StopReport};
pub use scheduler::{ActionScheduler, PendingId};
pub use service::NotificationAcker;
