//! Notification Acker Service
//!
//! The lifecycle controller: owns the rule set, every subscription handle,
//! the per-rule routers and the scheduler of one start/stop cycle.

use std::sync::Arc;

use async_trait::async_trait;
use signalk_bus::SubscriptionHandle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{AckerConfig, AckerSettings};
use crate::domain::{build_rules, Rule};
use crate::error::{AckerError, AckerResult};
use crate::ports::inbound::{AckerApi, AckerStatus, LifecyclePhase, StartReport, StopReport};
use crate::ports::outbound::{MessageHandler, Nmea2000Output, SubscriptionManager};
use crate::router;
use crate::scheduler::ActionScheduler;

/// Everything owned by one running cycle.
struct RunningCycle<M, N> {
    rules: Vec<Arc<Rule>>,
    handles: Vec<SubscriptionHandle>,
    routers: Vec<JoinHandle<()>>,
    scheduler: Arc<ActionScheduler<M, N>>,
}

impl<M, N> Drop for RunningCycle<M, N> {
    fn drop(&mut self) {
        for task in &self.routers {
            task.abort();
        }
    }
}

enum LifecycleState<M, N> {
    Stopped,
    Running(RunningCycle<M, N>),
}

/// Notification acker implementation
pub struct NotificationAcker<S, M, N>
where
    S: SubscriptionManager,
    M: MessageHandler,
    N: Nmea2000Output,
{
    settings: AckerSettings,
    subscriptions: Arc<S>,
    messages: Arc<M>,
    n2k: Arc<N>,
    state: Mutex<LifecycleState<M, N>>,
}

impl<S, M, N> NotificationAcker<S, M, N>
where
    S: SubscriptionManager,
    M: MessageHandler + 'static,
    N: Nmea2000Output + 'static,
{
    /// Create a stopped acker.
    pub fn new(settings: AckerSettings, subscriptions: Arc<S>, messages: Arc<M>, n2k: Arc<N>) -> Self {
        Self {
            settings,
            subscriptions,
            messages,
            n2k,
            state: Mutex::new(LifecycleState::Stopped),
        }
    }

    /// Settings this acker was created with.
    pub fn settings(&self) -> &AckerSettings {
        &self.settings
    }
}

#[async_trait]
impl<S, M, N> AckerApi for NotificationAcker<S, M, N>
where
    S: SubscriptionManager + 'static,
    M: MessageHandler + 'static,
    N: Nmea2000Output + 'static,
{
    async fn start(&self, config: &AckerConfig) -> AckerResult<StartReport> {
        let mut state = self.state.lock().await;
        if matches!(*state, LifecycleState::Running(_)) {
            return Err(AckerError::AlreadyRunning);
        }

        let scheduler = Arc::new(ActionScheduler::new(
            self.settings.source_id.clone(),
            Arc::clone(&self.messages),
            Arc::clone(&self.n2k),
        ));
        let mut cycle = RunningCycle {
            rules: Vec::new(),
            handles: Vec::new(),
            routers: Vec::new(),
            scheduler,
        };
        let mut report = StartReport::default();

        for rule in build_rules(config).into_iter().map(Arc::new) {
            match router::open(self.subscriptions.as_ref(), &rule).await {
                Ok((handle, stream)) => {
                    let task = router::spawn(Arc::clone(&rule), stream, Arc::clone(&cycle.scheduler));
                    cycle.handles.push(handle);
                    cycle.routers.push(task);
                    report.subscribed.push(rule.notification_path().to_string());
                }
                Err(source) => {
                    let e = AckerError::Subscription {
                        path: rule.notification_path().to_string(),
                        source,
                    };
                    error!(error = %e, "Subscription failed");
                    report.failed.push(rule.notification_path().to_string());
                }
            }
            cycle.rules.push(rule);
        }

        info!(
            rules = cycle.rules.len(),
            subscribed = report.subscribed.len(),
            failed = report.failed.len(),
            "Notification acker started"
        );
        *state = LifecycleState::Running(cycle);
        Ok(report)
    }

    async fn stop(&self) -> StopReport {
        let mut state = self.state.lock().await;
        let LifecycleState::Running(mut cycle) = std::mem::replace(&mut *state, LifecycleState::Stopped) else {
            return StopReport::default();
        };

        // No router may hand the scheduler a match once we start cancelling.
        let routers = std::mem::take(&mut cycle.routers);
        for task in &routers {
            task.abort();
        }
        for task in routers {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Router task failed");
                }
            }
        }

        let mut report = StopReport::default();
        for handle in cycle.handles.drain(..) {
            handle.unsubscribe();
            report.unsubscribed += 1;
        }

        if self.settings.cancel_pending_on_stop {
            report.cancelled = cycle.scheduler.cancel_all();
        } else {
            report.left_pending = cycle.scheduler.pending_count();
        }

        info!(
            unsubscribed = report.unsubscribed,
            cancelled = report.cancelled,
            left_pending = report.left_pending,
            "Notification acker stopped"
        );
        report
    }

    async fn status(&self) -> AckerStatus {
        let state = self.state.lock().await;
        match &*state {
            LifecycleState::Stopped => AckerStatus {
                phase: LifecyclePhase::Stopped,
                rules: Vec::new(),
                subscriptions: 0,
                pending: 0,
            },
            LifecycleState::Running(cycle) => AckerStatus {
                phase: LifecyclePhase::Running,
                rules: cycle.rules.iter().map(|rule| rule.path().to_string()).collect(),
                subscriptions: cycle.handles.len(),
                pending: cycle.scheduler.pending_count(),
            },
        }
    }
}
