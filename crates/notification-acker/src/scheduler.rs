//! Action scheduler
//!
//! Arms one deferred acknowledgement per match and tracks every armed
//! timer until it fires or is cancelled.
//!
//! ```text
//! on_match ──→ schedule() ──→ [PENDING] ──delay──→ [FIRED] ──→ handle_message
//!                                 │                               └─→ nmea2000out × n
//!                                 └──cancel_all()──→ [CANCELLED]
//! ```
//!
//! A timer fires only if it can still remove its own entry from the pending
//! set, so a cancelled action never runs and a fired one is never counted
//! as cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use signalk_types::{Delta, NotificationValue};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::domain::{actisense_line, MatchSink, Rule};
use crate::ports::outbound::{MessageHandler, Nmea2000Output};

/// Identifier of an armed acknowledgement.
pub type PendingId = u64;

/// An armed, not yet fired acknowledgement.
struct PendingAction {
    rule: Arc<Rule>,
    armed_at: Instant,
    task: Option<JoinHandle<()>>,
}

type PendingSet = Arc<Mutex<HashMap<PendingId, PendingAction>>>;

/// Schedules acknowledgements and owns their timers.
pub struct ActionScheduler<M, N> {
    source_id: Arc<str>,
    messages: Arc<M>,
    n2k: Arc<N>,
    pending: PendingSet,
    next_id: AtomicU64,
}

impl<M, N> ActionScheduler<M, N>
where
    M: MessageHandler + 'static,
    N: Nmea2000Output + 'static,
{
    /// Create a scheduler emitting under `source_id`.
    pub fn new(source_id: impl Into<String>, messages: Arc<M>, n2k: Arc<N>) -> Self {
        Self {
            source_id: Arc::from(source_id.into()),
            messages,
            n2k,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Arm an acknowledgement of `value` for `rule`.
    ///
    /// Returns immediately. The acknowledgement runs on its own task after
    /// `rule.delay()`, never inline, even for a zero delay. Must be called
    /// from within a Tokio runtime.
    pub fn schedule(&self, rule: &Arc<Rule>, value: &NotificationValue) -> PendingId {
        let snapshot = value.acknowledged();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.pending.lock().insert(
            id,
            PendingAction {
                rule: Arc::clone(rule),
                armed_at: Instant::now(),
                task: None,
            },
        );

        let task = tokio::spawn({
            let rule = Arc::clone(rule);
            let pending = Arc::clone(&self.pending);
            let source_id = Arc::clone(&self.source_id);
            let messages = Arc::clone(&self.messages);
            let n2k = Arc::clone(&self.n2k);
            async move {
                tokio::time::sleep(rule.delay()).await;

                let Some(action) = pending.lock().remove(&id) else {
                    return;
                };
                debug!(
                    id,
                    path = action.rule.path(),
                    waited_ms = action.armed_at.elapsed().as_millis() as u64,
                    "Acknowledgement timer fired"
                );

                execute(&source_id, messages.as_ref(), n2k.as_ref(), &rule, snapshot).await;
            }
        });

        // The entry is gone already if a zero-delay timer beat us here.
        if let Some(action) = self.pending.lock().get_mut(&id) {
            action.task = Some(task);
        }

        id
    }

    /// Number of armed acknowledgements.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Paths of armed acknowledgements, oldest first.
    #[must_use]
    pub fn pending_paths(&self) -> Vec<String> {
        let pending = self.pending.lock();
        let mut entries: Vec<(&PendingId, &PendingAction)> = pending.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries
            .into_iter()
            .map(|(_, action)| action.rule.path().to_string())
            .collect()
    }

    /// Cancel every armed acknowledgement. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingAction> = self.pending.lock().drain().map(|(_, a)| a).collect();
        let cancelled = drained.len();
        for action in drained {
            if let Some(task) = action.task {
                task.abort();
            }
        }
        if cancelled > 0 {
            debug!(cancelled, "Cancelled pending acknowledgements");
        }
        cancelled
    }
}

impl<M, N> MatchSink for ActionScheduler<M, N>
where
    M: MessageHandler + 'static,
    N: Nmea2000Output + 'static,
{
    fn on_match(&self, rule: &Arc<Rule>, value: &NotificationValue) {
        debug!(path = rule.path(), state = ?value.state(), "Got notification");
        self.schedule(rule, value);
    }
}

/// Emit the acknowledgement delta, then every outbound message in order.
///
/// Failures are logged and do not stop the remaining emissions.
async fn execute<M, N>(source_id: &str, messages: &M, n2k: &N, rule: &Rule, snapshot: NotificationValue)
where
    M: MessageHandler + ?Sized,
    N: Nmea2000Output + ?Sized,
{
    let delta = Delta::single(rule.path(), snapshot.into_value());
    debug!(source = source_id, delta = ?delta, "Sending delta");

    if let Err(e) = messages.handle_message(source_id, delta).await {
        error!(path = rule.path(), error = %e, "Failed to send acknowledgement");
    }

    for body in rule.outbound_messages() {
        let line = actisense_line(body, Utc::now());
        debug!(line = %line, "Sending n2k");
        if let Err(e) = n2k.send(line).await {
            error!(path = rule.path(), error = %e, "Failed to send NMEA 2000 message");
        }
    }
}
