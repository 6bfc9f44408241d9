//! # Delta Messages
//!
//! A delta is the unit of change propagation on the bus: a batch of
//! updates, each carrying `(path, value)` pairs.
//!
//! ```text
//! { "context": "vessels.self",
//!   "updates": [ { "values": [ { "path": "notifications.mob",
//!                                "value": { "state": "alarm" } } ] } ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SELF_CONTEXT;

/// A batch of updates for one context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delta {
    /// Context the updates apply to. Absent means the self vessel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Updates in arrival order.
    #[serde(default)]
    pub updates: Vec<Update>,
}

/// One update within a delta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Update {
    /// Structured source description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    /// Source reference string.
    #[serde(rename = "$source", default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// ISO-8601 timestamp of the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Values carried by this update.
    #[serde(default)]
    pub values: Vec<PathValue>,
}

/// A single `(path, value)` pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathValue {
    /// Dotted Signal K path.
    #[serde(default)]
    pub path: String,
    /// Value at the path; `null` when the sender omitted it.
    #[serde(default)]
    pub value: Value,
}

impl Delta {
    /// A delta with one update holding one value.
    #[must_use]
    pub fn single(path: impl Into<String>, value: Value) -> Self {
        Self {
            context: None,
            updates: vec![Update {
                values: vec![PathValue {
                    path: path.into(),
                    value,
                }],
                ..Update::default()
            }],
        }
    }

    /// Set the context, returning the delta.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether this delta applies to the self vessel.
    ///
    /// `self_urn` is the vessel's full context (e.g.
    /// `vessels.urn:mrn:imo:mmsi:230099999`) when the server announced one.
    #[must_use]
    pub fn context_matches(&self, self_urn: Option<&str>) -> bool {
        match self.context.as_deref() {
            None => true,
            Some(SELF_CONTEXT) => true,
            Some(context) => self_urn == Some(context),
        }
    }

    /// Iterate every `(path, value)` pair across all updates.
    pub fn path_values(&self) -> impl Iterator<Item = &PathValue> {
        self.updates.iter().flat_map(|update| update.values.iter())
    }

    /// Whether the delta carries no values at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_values().next().is_none()
    }
}
