//! Acknowledgement rules
//!
//! A [`Rule`] is the immutable, resolved form of one enabled
//! [`NotificationConfig`] entry. Rules are built once per start and shared
//! by the router and the scheduler for the whole cycle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use signalk_types::{notification_path, AlarmState, NotificationValue, SubscribeCommand, UnknownAlarmState};

use crate::config::{AckerConfig, NotificationConfig};

/// Separator between outbound NMEA 2000 messages in configuration.
pub const MESSAGE_SEPARATOR: char = ';';

/// Configuration name of [`RuleState::Any`].
pub const ANY_STATE: &str = "any";

/// Which notification states a rule acknowledges.
///
/// Configured as `"any"` or an alarm state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleState {
    /// Every non-normal state.
    Any,
    /// One alarm state only.
    State(AlarmState),
}

impl Default for RuleState {
    fn default() -> Self {
        Self::State(AlarmState::Alarm)
    }
}

impl RuleState {
    /// Configuration representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => ANY_STATE,
            Self::State(state) => state.as_str(),
        }
    }

    /// Whether the state of `value` is one this rule selects.
    ///
    /// Does not exclude `normal`; see [`crate::domain::matching::is_match`].
    #[must_use]
    pub fn accepts(self, value: &NotificationValue) -> bool {
        match self {
            Self::Any => value.state().is_some(),
            Self::State(state) => value.alarm_state() == Some(state),
        }
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleState {
    type Err = UnknownAlarmState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ANY_STATE {
            return Ok(Self::Any);
        }
        s.parse().map(Self::State)
    }
}

impl TryFrom<String> for RuleState {
    type Error = UnknownAlarmState;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RuleState> for String {
    fn from(state: RuleState) -> Self {
        state.as_str().to_string()
    }
}

/// One enabled acknowledgement rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    path: String,
    notification_path: String,
    state: RuleState,
    delay: Duration,
    outbound_messages: Vec<String>,
}

impl Rule {
    /// Resolve a configuration entry. The `enabled` flag is not consulted.
    #[must_use]
    pub fn from_config(entry: &NotificationConfig) -> Self {
        Self {
            path: entry.path.clone(),
            notification_path: notification_path(&entry.path),
            state: entry.state,
            delay: delay_from_secs(entry.delay),
            outbound_messages: split_messages(entry.send_n2k_messages.as_deref()),
        }
    }

    /// Bare path, as configured.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fully-qualified `notifications.<path>`.
    #[must_use]
    pub fn notification_path(&self) -> &str {
        &self.notification_path
    }

    #[must_use]
    pub fn state(&self) -> RuleState {
        self.state
    }

    /// Wait between match and acknowledgement.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// NMEA 2000 message templates, in configured order.
    #[must_use]
    pub fn outbound_messages(&self) -> &[String] {
        &self.outbound_messages
    }

    /// The bus subscription this rule needs.
    #[must_use]
    pub fn subscribe_command(&self) -> SubscribeCommand {
        SubscribeCommand::instant(self.notification_path.clone())
    }
}

/// Build the rule set: enabled entries only, in configuration order.
#[must_use]
pub fn build_rules(config: &AckerConfig) -> Vec<Rule> {
    config
        .notifications
        .iter()
        .filter(|entry| entry.enabled)
        .map(Rule::from_config)
        .collect()
}

/// Negative and non-finite delays mean no delay.
fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

fn split_messages(raw: Option<&str>) -> Vec<String> {
    match raw {
        None | Some("") => Vec::new(),
        Some(messages) => messages
            .split(MESSAGE_SEPARATOR)
            .map(str::to_string)
            .collect(),
    }
}
