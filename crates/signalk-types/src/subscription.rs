//! # Subscription Commands
//!
//! Client-to-server messages that open and close delta subscriptions.

use serde::{Deserialize, Serialize};

use crate::SELF_CONTEXT;

/// Delivery policy for a subscribed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Deliver every change as it happens.
    #[default]
    Instant,
    /// Deliver changes, resending the last value when idle.
    Ideal,
    /// Deliver at a fixed period.
    Fixed,
}

/// One path entry in a subscribe command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribePath {
    pub path: String,
    #[serde(default)]
    pub policy: Policy,
}

/// Subscribe to paths within a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeCommand {
    pub context: String,
    pub subscribe: Vec<SubscribePath>,
}

impl SubscribeCommand {
    /// Subscribe to one self-vessel path with instant delivery.
    #[must_use]
    pub fn instant(path: impl Into<String>) -> Self {
        Self {
            context: SELF_CONTEXT.to_string(),
            subscribe: vec![SubscribePath {
                path: path.into(),
                policy: Policy::Instant,
            }],
        }
    }

    /// The matching unsubscribe command.
    #[must_use]
    pub fn to_unsubscribe(&self) -> UnsubscribeCommand {
        UnsubscribeCommand {
            context: self.context.clone(),
            unsubscribe: self
                .subscribe
                .iter()
                .map(|entry| UnsubscribePath {
                    path: entry.path.clone(),
                })
                .collect(),
        }
    }

    /// Paths named by this command.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.subscribe.iter().map(|entry| entry.path.as_str())
    }
}

/// One path entry in an unsubscribe command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribePath {
    pub path: String,
}

/// Close subscriptions within a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeCommand {
    pub context: String,
    pub unsubscribe: Vec<UnsubscribePath>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instant_command_shape() {
        let command = SubscribeCommand::instant("notifications.mob");
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({
                "context": "vessels.self",
                "subscribe": [{"path": "notifications.mob", "policy": "instant"}]
            })
        );
    }

    #[test]
    fn test_to_unsubscribe() {
        let command = SubscribeCommand::instant("notifications.mob");
        assert_eq!(
            serde_json::to_value(command.to_unsubscribe()).unwrap(),
            json!({"context": "vessels.self", "unsubscribe": [{"path": "notifications.mob"}]})
        );
    }

    #[test]
    fn test_policy_defaults_to_instant() {
        let entry: SubscribePath = serde_json::from_str(r#"{"path":"a.b"}"#).unwrap();
        assert_eq!(entry.policy, Policy::Instant);
    }
}
