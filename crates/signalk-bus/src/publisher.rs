//! # Delta Publisher
//!
//! Defines the publishing side of the delta bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use signalk_types::{Delta, SubscribeCommand, SELF_CONTEXT};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::filter::DeltaFilter;
use crate::subscriber::{DeltaSubscription, SubscriptionError, SubscriptionGuard};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// A delta handed to the bus by a named producer.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Identifier of the producer (plugin id).
    pub source_id: String,
    /// The delta as handed over.
    pub delta: Delta,
}

/// A named application event with a string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEvent {
    pub name: String,
    pub payload: String,
}

/// In-memory delta bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics; filtering happens on the subscriber side.
pub struct DeltaBus {
    /// Broadcast sender for deltas.
    sender: broadcast::Sender<Arc<Delta>>,

    /// Messages handed over through `handle_message`.
    messages: broadcast::Sender<InboundMessage>,

    /// Application events.
    events: broadcast::Sender<AppEvent>,

    /// Full context of the self vessel, once known.
    self_context: Arc<RwLock<Option<String>>>,

    /// Active subscription count by path set.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total deltas published.
    deltas_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl DeltaBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (messages, _) = broadcast::channel(capacity);
        let (events, _) = broadcast::channel(capacity);
        Self {
            sender,
            messages,
            events,
            self_context: Arc::new(RwLock::new(None)),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            deltas_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe with a Signal K subscribe command.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::InvalidCommand` when the command names no paths
    /// or an empty path.
    pub fn subscribe(&self, command: SubscribeCommand) -> Result<DeltaSubscription, SubscriptionError> {
        if command.subscribe.is_empty() {
            return Err(SubscriptionError::InvalidCommand {
                reason: "no paths to subscribe".to_string(),
            });
        }
        if command.paths().any(str::is_empty) {
            return Err(SubscriptionError::InvalidCommand {
                reason: "empty subscription path".to_string(),
            });
        }

        let receiver = self.sender.subscribe();
        let topic_key = command.paths().collect::<Vec<_>>().join(",");

        // Track subscription
        {
            if let Ok(mut subs) = self.subscriptions.write() {
                *subs.entry(topic_key.clone()).or_insert(0) += 1;
            }
        }

        debug!(context = %command.context, paths = %topic_key, "New subscription created");

        let guard = SubscriptionGuard::new(Arc::clone(&self.subscriptions), topic_key);
        Ok(DeltaSubscription::new(
            receiver,
            DeltaFilter::from_command(&command),
            Arc::clone(&self.self_context),
            guard,
        ))
    }

    /// Publish a delta to every subscriber.
    ///
    /// Returns the number of receivers the delta reached before filtering.
    pub fn publish(&self, delta: Delta) -> usize {
        self.deltas_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(Arc::new(delta)) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Delta published");
                receiver_count
            }
            Err(_) => {
                debug!("Delta dropped (no receivers)");
                0
            }
        }
    }

    /// Accept a delta from a producer, as a server does for its plugins.
    ///
    /// The delta is recorded on the message channel and republished with its
    /// context defaulted to the self vessel.
    pub fn handle_message(&self, source_id: &str, delta: Delta) -> usize {
        let message = InboundMessage {
            source_id: source_id.to_string(),
            delta: delta.clone(),
        };
        if self.messages.send(message).is_err() {
            debug!(source = source_id, "Message not recorded (no listeners)");
        }

        let delta = if delta.context.is_some() {
            delta
        } else {
            delta.with_context(SELF_CONTEXT)
        };
        self.publish(delta)
    }

    /// Emit an application event.
    ///
    /// Returns the number of listeners.
    pub fn emit(&self, name: &str, payload: String) -> usize {
        match self.events.send(AppEvent {
            name: name.to_string(),
            payload,
        }) {
            Ok(listeners) => listeners,
            Err(e) => {
                warn!(event = name, error = %e, "Event dropped (no listeners)");
                0
            }
        }
    }

    /// Listen to messages handed over through `handle_message`.
    #[must_use]
    pub fn messages(&self) -> broadcast::Receiver<InboundMessage> {
        self.messages.subscribe()
    }

    /// Listen to application events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Record the self vessel's full context (e.g. from a server hello).
    pub fn set_self_context(&self, urn: impl Into<String>) {
        if let Ok(mut context) = self.self_context.write() {
            *context = Some(urn.into());
        }
    }

    /// The self vessel's full context, if known.
    #[must_use]
    pub fn self_context(&self) -> Option<String> {
        self.self_context.read().ok().and_then(|urn| urn.clone())
    }

    /// Number of tracked subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .map(|subs| subs.values().sum())
            .unwrap_or(0)
    }

    /// Path sets with at least one live subscription, sorted.
    #[must_use]
    pub fn active_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .subscriptions
            .read()
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Total deltas published.
    #[must_use]
    pub fn deltas_published(&self) -> u64 {
        self.deltas_published.load(Ordering::Relaxed)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DeltaBus {
    fn default() -> Self {
        Self::new()
    }
}
