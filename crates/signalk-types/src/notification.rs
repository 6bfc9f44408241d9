//! # Notification Values
//!
//! A notification is a bus entity under `notifications.*` whose value
//! carries an alarm `state`, the delivery `method`s used to alert the crew,
//! and any number of fields this crate does not interpret.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::UnknownAlarmState;

/// Alarm states defined by Signal K, lowest severity first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Nominal,
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl AlarmState {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Normal => "normal",
            Self::Alert => "alert",
            Self::Warn => "warn",
            Self::Alarm => "alarm",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmState {
    type Err = UnknownAlarmState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nominal" => Ok(Self::Nominal),
            "normal" => Ok(Self::Normal),
            "alert" => Ok(Self::Alert),
            "warn" => Ok(Self::Warn),
            "alarm" => Ok(Self::Alarm),
            "emergency" => Ok(Self::Emergency),
            other => Err(UnknownAlarmState(other.to_string())),
        }
    }
}

/// The value object of a notification.
///
/// Stored as the raw JSON object so unknown fields survive verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationValue(Map<String, Value>);

impl NotificationValue {
    /// Field holding the alert delivery methods.
    pub const METHOD_FIELD: &'static str = "method";

    /// Field holding the alarm state.
    pub const STATE_FIELD: &'static str = "state";

    /// Copy a JSON value into a notification value.
    ///
    /// Returns `None` unless `value` is an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(Self)
    }

    /// The raw `state` string, if present and a string.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.0.get(Self::STATE_FIELD).and_then(Value::as_str)
    }

    /// The `state` parsed as a known alarm state.
    #[must_use]
    pub fn alarm_state(&self) -> Option<AlarmState> {
        self.state().and_then(|s| s.parse().ok())
    }

    /// The `method` field as given.
    #[must_use]
    pub fn method(&self) -> Option<&Value> {
        self.0.get(Self::METHOD_FIELD)
    }

    /// Look up any field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A deep copy with `method` cleared to an empty list.
    ///
    /// An empty method list tells every consumer not to alert again.
    #[must_use]
    pub fn acknowledged(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot
            .0
            .insert(Self::METHOD_FIELD.to_string(), Value::Array(Vec::new()));
        snapshot
    }

    /// Convert back into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for NotificationValue {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alarm_state_round_trip_names() {
        for state in [
            AlarmState::Nominal,
            AlarmState::Normal,
            AlarmState::Alert,
            AlarmState::Warn,
            AlarmState::Alarm,
            AlarmState::Emergency,
        ] {
            assert_eq!(state.as_str().parse::<AlarmState>(), Ok(state));
        }
        assert!("panic".parse::<AlarmState>().is_err());
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(NotificationValue::from_value(&json!("alarm")).is_none());
        assert!(NotificationValue::from_value(&Value::Null).is_none());
        let value = NotificationValue::from_value(&json!({"state": "warn"})).unwrap();
        assert_eq!(value.state(), Some("warn"));
        assert_eq!(value.alarm_state(), Some(AlarmState::Warn));
    }

    #[test]
    fn test_state_must_be_string() {
        let value = NotificationValue::from_value(&json!({"state": 3})).unwrap();
        assert_eq!(value.state(), None);
    }

    #[test]
    fn test_acknowledged_clears_method_and_keeps_fields() {
        let original = NotificationValue::from_value(&json!({
            "state": "alarm",
            "method": ["sound", "visual"],
            "message": "Man overboard",
            "position": {"latitude": 60.1, "longitude": 24.9}
        }))
        .unwrap();

        let ack = original.acknowledged();

        assert_eq!(ack.method(), Some(&json!([])));
        assert_eq!(ack.state(), Some("alarm"));
        assert_eq!(ack.get("message"), original.get("message"));
        assert_eq!(ack.get("position"), original.get("position"));
        // the source value is untouched
        assert_eq!(original.method(), Some(&json!(["sound", "visual"])));
    }

    #[test]
    fn test_acknowledged_adds_missing_method() {
        let original = NotificationValue::from_value(&json!({"state": "warn"})).unwrap();
        assert_eq!(
            original.acknowledged().into_value(),
            json!({"state": "warn", "method": []})
        );
    }
}
