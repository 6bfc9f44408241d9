//! Subscription routing
//!
//! Opens the bus subscription for a rule and drains it on a dedicated task,
//! feeding every delta through the match engine into a [`MatchSink`].
//! One task per subscription keeps deltas in arrival order per rule.

use std::sync::Arc;

use signalk_bus::{DeltaStream, SubscriptionError, SubscriptionHandle};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::domain::{dispatch, MatchSink, Rule};
use crate::ports::outbound::SubscriptionManager;

/// Open the subscription `rule` needs.
///
/// # Errors
///
/// Whatever the subscription manager reports.
pub async fn open<S>(subscriptions: &S, rule: &Rule) -> Result<(SubscriptionHandle, DeltaStream), SubscriptionError>
where
    S: SubscriptionManager + ?Sized,
{
    let command = rule.subscribe_command();
    debug!(command = ?command, "Subscribe");
    subscriptions.subscribe(command).await
}

/// Drain `stream` on a new task.
pub fn spawn<K>(rule: Arc<Rule>, stream: DeltaStream, sink: Arc<K>) -> JoinHandle<()>
where
    K: MatchSink + ?Sized + 'static,
{
    tokio::spawn(route(rule, stream, sink))
}

/// Drain `stream` until it ends.
///
/// Stream errors are logged and skipped.
pub async fn route<K>(rule: Arc<Rule>, mut stream: DeltaStream, sink: Arc<K>)
where
    K: MatchSink + ?Sized,
{
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                let matched = dispatch(&rule, &delta, sink.as_ref());
                if matched > 0 {
                    debug!(path = rule.notification_path(), matched, "Delta matched");
                }
            }
            Err(e) => {
                error!(path = rule.notification_path(), error = %e, "Subscription error");
            }
        }
    }
    debug!(path = rule.notification_path(), "Subscription stream ended");
}
