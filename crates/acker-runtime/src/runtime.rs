//! # Acker Runtime
//!
//! Wires the Signal K client, the local delta bus, the NMEA 2000 sink and
//! the acker together.
//!
//! ## Startup Sequence
//!
//! 1. Spawn the client connection loop
//! 2. Start the acker with the plugin rules (subscriptions are queued
//!    until the connection is up)
//!
//! ## Shutdown Sequence
//!
//! 1. Stop the acker (unsubscribe, cancel pending acknowledgements)
//! 2. Signal the client to close the connection
//! 3. Wait for the connection loop, bounded by a timeout

use std::sync::Arc;
use std::time::Duration;

use notification_acker::{AckerApi, AckerConfig, AckerStatus, NotificationAcker, StartReport, StopReport};
use parking_lot::Mutex;
use signalk_bus::DeltaBus;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;
use crate::error::{ClientError, RuntimeError};
use crate::n2k::N2kSink;
use crate::signalk::{ClientExit, SignalKClient, SignalKMessages, SignalKSubscriptions};

/// How long shutdown waits for the connection loop.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type ServerAcker = NotificationAcker<SignalKSubscriptions, SignalKMessages, N2kSink>;

/// The running process.
pub struct AckerRuntime {
    bus: Arc<DeltaBus>,
    client: SignalKClient,
    acker: ServerAcker,
    shutdown_tx: watch::Sender<bool>,
    client_task: Mutex<Option<JoinHandle<ClientExit>>>,
}

impl AckerRuntime {
    /// Build the runtime. Nothing connects until [`Self::start`].
    pub fn new(config: &RuntimeConfig) -> Self {
        let bus = Arc::new(DeltaBus::new());
        let client = SignalKClient::new(config.server.clone(), Arc::clone(&bus));
        let acker = NotificationAcker::new(
            config.acker.clone(),
            Arc::new(SignalKSubscriptions::new(client.handle(), Arc::clone(&bus))),
            Arc::new(SignalKMessages::new(client.handle())),
            Arc::new(N2kSink::from_config(&config.n2k)),
        );
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            bus,
            client,
            acker,
            shutdown_tx,
            client_task: Mutex::new(None),
        }
    }

    /// Connect to the server and start acknowledging with `rules`.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Client` if already started, `RuntimeError::Acker` if
    /// the acker is already running.
    pub async fn start(&self, rules: &AckerConfig) -> Result<StartReport, RuntimeError> {
        let task = self.client.spawn(self.shutdown_tx.subscribe())?;
        *self.client_task.lock() = Some(task);

        let report = self.acker.start(rules).await?;
        log_start(&report);
        Ok(report)
    }

    /// Restart the acker with new rules, keeping the connection.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Client` if the connection loop has ended,
    /// `RuntimeError::Acker` if the restart fails.
    pub async fn reload(&self, rules: &AckerConfig) -> Result<StartReport, RuntimeError> {
        if let Some(exit) = self.client_exit() {
            warn!(exit = %exit, "Not reloading, Signal K client has stopped");
            return Err(ClientError::Closed.into());
        }
        info!("Reloading notification rules");
        self.acker.stop().await;
        let report = self.acker.start(rules).await?;
        log_start(&report);
        Ok(report)
    }

    /// Stop the acker and close the connection.
    pub async fn shutdown(&self) -> StopReport {
        info!("Initiating graceful shutdown...");
        let report = self.acker.stop().await;

        if let Err(e) = self.shutdown_tx.send(true) {
            // No receiver means the client never started
            info!(error = %e, "Client was not running");
        }

        let task = self.client_task.lock().take();
        if let Some(task) = task {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(exit)) => info!(exit = %exit, "Client task finished"),
                Ok(Err(e)) => error!(error = %e, "Client task failed"),
                Err(_) => warn!("Client did not stop in time"),
            }
        }

        info!("Shutdown complete");
        report
    }

    /// Resolves once the connection loop has ended, whatever the reason.
    ///
    /// Pending forever if the client was never started.
    pub async fn client_stopped(&self) -> ClientExit {
        let mut exit = self.client.exit();
        let outcome = match exit.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(ClientExit::Shutdown),
            Err(_) => ClientExit::Shutdown,
        };
        outcome
    }

    /// How the connection loop ended, if it has.
    #[must_use]
    pub fn client_exit(&self) -> Option<ClientExit> {
        let exit = self.client.exit();
        let outcome = *exit.borrow();
        outcome
    }

    /// Acker status.
    pub async fn status(&self) -> AckerStatus {
        self.acker.status().await
    }

    /// The local delta bus.
    #[must_use]
    pub fn bus(&self) -> &Arc<DeltaBus> {
        &self.bus
    }
}

fn log_start(report: &StartReport) {
    for path in &report.failed {
        warn!(path = %path, "Rule not active, subscription failed");
    }
    info!(subscribed = report.subscribed.len(), "Watching notifications");
}
