//! Domain layer: rules, matching, and outbound message formatting.
//!
//! Everything here is pure; no I/O, no timers.

pub mod matching;
pub mod n2k;
pub mod rule;

pub use matching::{dispatch, is_match, matching_values, MatchSink, NORMAL_STATE};
pub use n2k::actisense_line;
pub use rule::{build_rules, Rule, RuleState};
