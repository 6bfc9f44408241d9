//! Plugin identity and the configuration schema shown by admin UIs.

use serde_json::{json, Value};

/// Plugin identifier, also the default source id of acknowledgements.
pub const PLUGIN_ID: &str = "signalk-notification-acker";

/// Display name.
pub const PLUGIN_NAME: &str = "Notification Acker";

/// One-line description.
pub const PLUGIN_DESCRIPTION: &str =
    "SignalK Node Server Plugin that auto acknowledges configured notifications";

/// JSON schema of [`crate::config::AckerConfig`].
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "type": "object",
        "title": "Notifications",
        "properties": {
            "notifications": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "title": "The notification path (not including the leading 'notifications.'",
                            "type": "string",
                            "default": ""
                        },
                        "state": {
                            "type": "string",
                            "title": "Alarm State",
                            "description": "The alarm state for this command.",
                            "default": "alarm",
                            "enum": ["any", "alert", "warn", "alarm", "emergency"]
                        },
                        "enabled": {
                            "type": "boolean",
                            "title": "Enabled",
                            "default": true
                        },
                        "delay": {
                            "type": "number",
                            "title": "Seconds to wait before acknowledgement. Zero for immediate",
                            "default": 0
                        },
                        "sendN2KMessages": {
                            "type": "string",
                            "title": "NMEA 2000 Messages to send",
                            "description": "Actisence serial format without the first date/time field. Separate multiple messages with a semi-colon"
                        }
                    }
                }
            }
        }
    })
}
