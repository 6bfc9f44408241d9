//! # Error Types

use thiserror::Error;

/// A string did not name a known alarm state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown alarm state: {0}")]
pub struct UnknownAlarmState(pub String);
