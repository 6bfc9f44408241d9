//! # Delta Filters
//!
//! Decides which parts of a delta a subscription receives.

use signalk_types::{Delta, SubscribeCommand, Update, SELF_CONTEXT};

/// Context value that matches every context.
pub const ANY_CONTEXT: &str = "*";

/// A dotted path pattern.
///
/// A `*` segment matches exactly one segment, except in last position where
/// it matches one or more remaining segments. `"*"` alone matches any path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<String>,
}

impl PathPattern {
    /// Parse a pattern.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            segments: pattern.split('.').map(str::to_string).collect(),
        }
    }

    /// Check a concrete path against the pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('.').collect();
        let last = self.segments.len() - 1;

        for (index, segment) in self.segments.iter().enumerate() {
            let is_wildcard = segment == "*";
            if index == last && is_wildcard {
                return parts.len() > index;
            }
            let Some(part) = parts.get(index) else {
                return false;
            };
            if !is_wildcard && segment != part {
                return false;
            }
        }

        parts.len() == self.segments.len()
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Filter derived from a subscribe command.
#[derive(Debug, Clone)]
pub struct DeltaFilter {
    /// Context the command was scoped to.
    pub context: String,
    /// Path patterns to include.
    pub patterns: Vec<PathPattern>,
}

impl DeltaFilter {
    /// Build the filter for a subscribe command.
    #[must_use]
    pub fn from_command(command: &SubscribeCommand) -> Self {
        Self {
            context: command.context.clone(),
            patterns: command.paths().map(PathPattern::new).collect(),
        }
    }

    /// Whether the delta's context is one this filter listens to.
    ///
    /// `self_urn` is the self vessel's full context, when known.
    #[must_use]
    pub fn applies_to(&self, delta: &Delta, self_urn: Option<&str>) -> bool {
        match self.context.as_str() {
            ANY_CONTEXT => true,
            SELF_CONTEXT => delta.context_matches(self_urn),
            context => delta.context.as_deref() == Some(context),
        }
    }

    /// Whether any pattern accepts the path.
    #[must_use]
    pub fn accepts_path(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    /// The part of `delta` this filter lets through, or `None` if nothing.
    ///
    /// Updates left without values are dropped; update metadata is kept.
    #[must_use]
    pub fn restrict(&self, delta: &Delta, self_urn: Option<&str>) -> Option<Delta> {
        if !self.applies_to(delta, self_urn) {
            return None;
        }

        let updates: Vec<Update> = delta
            .updates
            .iter()
            .filter_map(|update| {
                let values: Vec<_> = update
                    .values
                    .iter()
                    .filter(|pv| self.accepts_path(&pv.path))
                    .cloned()
                    .collect();
                if values.is_empty() {
                    return None;
                }
                Some(Update {
                    values,
                    ..update.clone()
                })
            })
            .collect();

        if updates.is_empty() {
            return None;
        }

        Some(Delta {
            context: delta.context.clone(),
            updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use signalk_types::PathValue;

    #[test]
    fn test_exact_pattern() {
        let pattern = PathPattern::new("notifications.mob");
        assert!(pattern.matches("notifications.mob"));
        assert!(!pattern.matches("notifications.mob.extra"));
        assert!(!pattern.matches("notifications"));
        assert!(!pattern.matches("notifications.fire"));
    }

    #[test]
    fn test_trailing_wildcard() {
        let pattern = PathPattern::new("notifications.*");
        assert!(pattern.matches("notifications.mob"));
        assert!(pattern.matches("notifications.navigation.anchor"));
        assert!(!pattern.matches("notifications"));
        assert!(!pattern.matches("navigation.position"));
    }

    #[test]
    fn test_inner_wildcard() {
        let pattern = PathPattern::new("electrical.batteries.*.voltage");
        assert!(pattern.matches("electrical.batteries.house.voltage"));
        assert!(!pattern.matches("electrical.batteries.house.current"));
        assert!(!pattern.matches("electrical.batteries.house.cell.voltage"));
    }

    #[test]
    fn test_star_matches_everything() {
        let pattern = PathPattern::new("*");
        assert!(pattern.matches("a"));
        assert!(pattern.matches("a.b.c"));
    }

    #[test]
    fn test_restrict_keeps_matching_values_only() {
        let filter = DeltaFilter::from_command(&SubscribeCommand::instant("notifications.mob"));
        let delta = Delta {
            context: None,
            updates: vec![
                Update {
                    source_ref: Some("a".into()),
                    values: vec![
                        PathValue { path: "notifications.mob".into(), value: json!({"state": "alarm"}) },
                        PathValue { path: "navigation.speedOverGround".into(), value: json!(3.2) },
                    ],
                    ..Update::default()
                },
                Update {
                    values: vec![PathValue { path: "environment.wind.speedApparent".into(), value: json!(5) }],
                    ..Update::default()
                },
            ],
        };

        let restricted = filter.restrict(&delta, None).unwrap();
        assert_eq!(restricted.updates.len(), 1);
        assert_eq!(restricted.updates[0].source_ref.as_deref(), Some("a"));
        assert_eq!(restricted.updates[0].values.len(), 1);
        assert_eq!(restricted.updates[0].values[0].path, "notifications.mob");
    }

    #[test]
    fn test_restrict_rejects_foreign_context() {
        let filter = DeltaFilter::from_command(&SubscribeCommand::instant("notifications.mob"));
        let delta = Delta::single("notifications.mob", json!({"state": "alarm"}))
            .with_context("vessels.urn:mrn:imo:mmsi:111111111");
        assert!(filter.restrict(&delta, Some("vessels.urn:mrn:imo:mmsi:222222222")).is_none());
        assert!(filter.restrict(&delta, Some("vessels.urn:mrn:imo:mmsi:111111111")).is_some());
    }

    #[test]
    fn test_any_context() {
        let mut command = SubscribeCommand::instant("notifications.*");
        command.context = ANY_CONTEXT.to_string();
        let filter = DeltaFilter::from_command(&command);
        let delta = Delta::single("notifications.mob", json!({})).with_context("vessels.other");
        assert!(filter.restrict(&delta, None).is_some());
    }
}
