//! # Delta Subscriber
//!
//! Defines the subscription side of the delta bus.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use signalk_types::Delta;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::filter::DeltaFilter;
use crate::handle::SubscriptionHandle;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The delta bus was closed.
    #[error("Delta bus closed")]
    Closed,

    /// The subscribe command cannot be served.
    #[error("Invalid subscribe command: {reason}")]
    InvalidCommand { reason: String },

    /// The server refused the subscription.
    #[error("Subscription rejected: {reason}")]
    Rejected { reason: String },

    /// The connection carrying the subscription failed.
    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

/// A boxed stream of filtered deltas.
///
/// `Err` items report subscription-level failures; the stream keeps going
/// after them and ends when the source closes.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, SubscriptionError>> + Send>>;

/// Keeps a subscription counted by the bus until dropped.
pub(crate) struct SubscriptionGuard {
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    topic_key: String,
}

impl SubscriptionGuard {
    pub(crate) fn new(subscriptions: Arc<RwLock<HashMap<String, usize>>>, topic_key: String) -> Self {
        Self {
            subscriptions,
            topic_key,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.topic_key) else {
            debug!(topic = %self.topic_key, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.topic_key);
        }
        debug!(topic = %self.topic_key, "Subscription dropped");
    }
}

/// A live subscription to the bus.
///
/// When dropped, the subscription is automatically untracked.
pub struct DeltaSubscription {
    receiver: broadcast::Receiver<Arc<Delta>>,
    filter: DeltaFilter,
    self_context: Arc<RwLock<Option<String>>>,
    guard: SubscriptionGuard,
}

impl DeltaSubscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Arc<Delta>>,
        filter: DeltaFilter,
        self_context: Arc<RwLock<Option<String>>>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self {
            receiver,
            filter,
            self_context,
            guard,
        }
    }

    /// Receive the next delta, restricted to the subscribed paths.
    ///
    /// # Returns
    ///
    /// - `Some(delta)` - The matching part of the next relevant delta
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<Delta> {
        loop {
            let delta = match self.receiver.recv().await {
                Ok(d) => d,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(topic = %self.guard.topic_key, lagged = count, "Subscriber lagged, deltas dropped");
                    continue;
                }
            };

            let urn = read_self_context(&self.self_context);
            if let Some(restricted) = self.filter.restrict(&delta, urn.as_deref()) {
                return Some(restricted);
            }
        }
    }

    /// Try to receive the next matching delta without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(delta))` - A delta was available and matched
    /// - `Ok(None)` - Nothing available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<Delta>, SubscriptionError> {
        loop {
            let delta = match self.receiver.try_recv() {
                Ok(d) => d,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(topic = %self.guard.topic_key, lagged = count, "Subscriber lagged, deltas dropped");
                    continue;
                }
            };

            let urn = read_self_context(&self.self_context);
            if let Some(restricted) = self.filter.restrict(&delta, urn.as_deref()) {
                return Ok(Some(restricted));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &DeltaFilter {
        &self.filter
    }

    /// Split into a release handle and a delta stream.
    ///
    /// Once the handle is released the subscription is untracked and the
    /// stream yields nothing further.
    #[must_use]
    pub fn into_parts(self) -> (SubscriptionHandle, DeltaStream) {
        let Self {
            receiver,
            filter,
            self_context,
            guard,
        } = self;

        let topic = guard.topic_key.clone();
        let active = Arc::new(AtomicBool::new(true));
        let handle = {
            let active = Arc::clone(&active);
            SubscriptionHandle::new(guard.topic_key.clone(), move || {
                active.store(false, Ordering::SeqCst);
                drop(guard);
            })
        };

        let stream = BroadcastStream::new(receiver)
            .take_while(move |_| active.load(Ordering::SeqCst))
            .filter_map(move |item| match item {
                Ok(delta) => {
                    let urn = read_self_context(&self_context);
                    filter.restrict(&delta, urn.as_deref()).map(Ok)
                }
                Err(BroadcastStreamRecvError::Lagged(count)) => {
                    warn!(topic = %topic, lagged = count, "Subscriber lagged, deltas dropped");
                    None
                }
            });

        (handle, Box::pin(stream))
    }
}

fn read_self_context(self_context: &RwLock<Option<String>>) -> Option<String> {
    self_context.read().ok().and_then(|urn| urn.clone())
}
