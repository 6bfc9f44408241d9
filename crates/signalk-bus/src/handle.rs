//! # Subscription Handles
//!
//! An opaque token for one open subscription. Releasing it runs the
//! unsubscribe action exactly once, whether through [`SubscriptionHandle::unsubscribe`]
//! or by dropping the handle.

use std::fmt;

use tracing::debug;
use uuid::Uuid;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for one open subscription.
pub struct SubscriptionHandle {
    id: Uuid,
    path: String,
    release: Option<ReleaseFn>,
}

impl SubscriptionHandle {
    /// Create a handle whose release runs `release`.
    pub fn new(path: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Unique identifier for this subscription.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path the subscription was opened for.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the release action has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Close the subscription.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            debug!(id = %self.id, path = %self.path, "Releasing subscription");
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("active", &self.is_active())
            .finish()
    }
}
