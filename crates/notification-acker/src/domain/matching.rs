//! Match engine
//!
//! Decides whether an incoming `(path, value)` pair is a notification a rule
//! acknowledges, and forwards every match to a [`MatchSink`].
//!
//! A pair matches when all of these hold:
//! - `path` is the rule's `notifications.<path>`
//! - `value.state` is a string other than `normal`
//! - the rule state is `any` or equals `value.state`

use std::sync::Arc;

use serde_json::Value;
use signalk_types::{Delta, NotificationValue};

use super::rule::Rule;

/// State of a notification that needs no acknowledgement.
pub const NORMAL_STATE: &str = "normal";

/// Receives matched notifications.
pub trait MatchSink: Send + Sync {
    /// Called once per matching value, in delta order.
    fn on_match(&self, rule: &Arc<Rule>, value: &NotificationValue);
}

/// Evaluate the predicate for one pair.
#[must_use]
pub fn is_match(rule: &Rule, path: &str, value: &Value) -> bool {
    path == rule.notification_path()
        && NotificationValue::from_value(value).is_some_and(|value| accepts(rule, &value))
}

/// Every value in `delta` that matches `rule`, in delta order.
pub fn matching_values<'a>(
    rule: &'a Rule,
    delta: &'a Delta,
) -> impl Iterator<Item = NotificationValue> + 'a {
    delta
        .path_values()
        .filter(|pv| pv.path == rule.notification_path())
        .filter_map(|pv| NotificationValue::from_value(&pv.value))
        .filter(|value| accepts(rule, value))
}

fn accepts(rule: &Rule, value: &NotificationValue) -> bool {
    value.state().is_some_and(|state| state != NORMAL_STATE) && rule.state().accepts(value)
}

/// Run the engine over a delta, forwarding matches to `sink`.
///
/// Returns the number of matches.
pub fn dispatch<S: MatchSink + ?Sized>(rule: &Arc<Rule>, delta: &Delta, sink: &S) -> usize {
    let mut matched = 0;
    for value in matching_values(rule, delta) {
        sink.on_match(rule, &value);
        matched += 1;
    }
    matched
}
