//! # Acker Configuration
//!
//! The operator-facing rule list, in the plugin configuration format:
//!
//! ```json
//! { "notifications": [
//!     { "path": "mob", "state": "alarm", "enabled": true, "delay": 2,
//!       "sendN2KMessages": "2,126208,1,255,..." } ] }
//! ```
//!
//! Field defaults follow the configuration schema in [`crate::metadata`].

use serde::{Deserialize, Serialize};

use crate::domain::RuleState;
use crate::error::{AckerError, AckerResult};
use crate::metadata::PLUGIN_ID;

/// Complete rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AckerConfig {
    /// Configured notifications, in operator order.
    #[serde(default)]
    pub notifications: Vec<NotificationConfig>,
}

impl AckerConfig {
    /// Decode a configuration document.
    ///
    /// # Errors
    ///
    /// `AckerError::Config` when the text is not a valid configuration.
    pub fn from_json(text: &str) -> AckerResult<Self> {
        serde_json::from_str(text).map_err(|e| AckerError::Config {
            reason: e.to_string(),
        })
    }
}

/// One configured notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notification path without the leading `notifications.`.
    #[serde(default)]
    pub path: String,
    /// Alarm state to acknowledge.
    #[serde(default)]
    pub state: RuleState,
    /// Disabled entries are ignored.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds to wait before acknowledging. Zero for immediate.
    #[serde(default)]
    pub delay: f64,
    /// Actisense-format messages without the leading timestamp,
    /// separated by semicolons.
    #[serde(
        rename = "sendN2KMessages",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub send_n2k_messages: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            state: RuleState::default(),
            enabled: default_enabled(),
            delay: 0.0,
            send_n2k_messages: None,
        }
    }
}

/// Process-level settings for one acker instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AckerSettings {
    /// Source identifier acknowledgements are sent under.
    pub source_id: String,
    /// Cancel armed acknowledgements on stop instead of letting them fire.
    pub cancel_pending_on_stop: bool,
}

impl Default for AckerSettings {
    fn default() -> Self {
        Self {
            source_id: PLUGIN_ID.to_string(),
            cancel_pending_on_stop: true,
        }
    }
}
