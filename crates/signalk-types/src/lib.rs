//! # Signal K Types Crate
//!
//! Wire-level entities exchanged with a Signal K server and between the
//! crates of this workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: deltas, notification values and
//!   subscription commands are defined once, here.
//! - **Tolerant Decoding**: missing fields decode to empty defaults so a
//!   malformed delta never aborts a stream; it simply fails to match.
//! - **Exact Encoding**: absent optional fields are skipped on encode, so an
//!   outbound delta carries only what was set.

pub mod delta;
pub mod errors;
pub mod notification;
pub mod subscription;

pub use delta::{Delta, PathValue, Update};
pub use errors::*;
pub use notification::{AlarmState, NotificationValue};
pub use subscription::{Policy, SubscribeCommand, SubscribePath, UnsubscribeCommand, UnsubscribePath};

/// Context addressing the vessel the server runs on.
pub const SELF_CONTEXT: &str = "vessels.self";

/// Root of the notification tree.
pub const NOTIFICATIONS_PREFIX: &str = "notifications";

/// Application event carrying raw NMEA 2000 messages in Actisense format.
pub const NMEA2000_OUT_EVENT: &str = "nmea2000out";

/// Fully-qualified notification path for a bare sub-path.
///
/// `notification_path("mob")` is `"notifications.mob"`.
#[must_use]
pub fn notification_path(path: &str) -> String {
    format!("{NOTIFICATIONS_PREFIX}.{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_path() {
        assert_eq!(notification_path("mob"), "notifications.mob");
        assert_eq!(
            notification_path("navigation.anchor"),
            "notifications.navigation.anchor"
        );
    }
}
