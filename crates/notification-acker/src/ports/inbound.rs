//! Driving Ports (API - Inbound Interface)

use async_trait::async_trait;

use crate::config::AckerConfig;
use crate::error::AckerResult;

/// Lifecycle phase of an acker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Stopped,
    Running,
}

/// Outcome of a start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Notification paths subscribed successfully.
    pub subscribed: Vec<String>,
    /// Notification paths whose subscription failed.
    pub failed: Vec<String>,
}

/// Outcome of a stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Subscription handles released.
    pub unsubscribed: usize,
    /// Armed acknowledgements cancelled.
    pub cancelled: usize,
    /// Armed acknowledgements left to fire.
    pub left_pending: usize,
}

/// Point-in-time view of an acker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckerStatus {
    pub phase: LifecyclePhase,
    /// Active rule paths, in configuration order.
    pub rules: Vec<String>,
    /// Open subscriptions.
    pub subscriptions: usize,
    /// Armed, not yet fired acknowledgements.
    pub pending: usize,
}

/// Start/stop control of the acknowledgement pipeline.
#[async_trait]
pub trait AckerApi: Send + Sync {
    /// Build the rule set from `config` and subscribe every rule.
    ///
    /// # Errors
    ///
    /// `AckerError::AlreadyRunning` if a cycle is active. Failing
    /// subscriptions are reported in the `StartReport`, not as errors.
    async fn start(&self, config: &AckerConfig) -> AckerResult<StartReport>;

    /// Release every subscription and apply the pending-action policy.
    /// A no-op when already stopped.
    async fn stop(&self) -> StopReport;

    /// Current status.
    async fn status(&self) -> AckerStatus;
}
