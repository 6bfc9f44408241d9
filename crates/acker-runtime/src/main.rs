//! # Notification Acker Runtime
//!
//! Connects to a Signal K server and auto-acknowledges configured
//! notifications.
//!
//! ## Usage
//!
//! ```bash
//! # Local server, rules from plugin-config-data/signalk-notification-acker.json
//! acker-runtime
//!
//! # Remote server with a token, NMEA 2000 lines to a gateway
//! acker-runtime --server-url ws://boat.local:3000/signalk/v1/stream?subscribe=none \
//!     --token "$TOKEN" --n2k-tcp 192.168.1.20:60002 --plugin-config acker.json
//! ```
//!
//! Send SIGHUP to reload the rules, Ctrl+C to stop.

use std::path::PathBuf;

use acker_runtime::{load_plugin_config, AckerRuntime, Hangup, N2kOutputConfig, RuntimeConfig};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Signal K notification acker
#[derive(Parser, Debug)]
#[command(name = "acker-runtime")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Runtime configuration file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Plugin configuration file with the notification rules
    #[arg(long)]
    plugin_config: Option<PathBuf>,

    /// Signal K WebSocket stream URL
    #[arg(long)]
    server_url: Option<String>,

    /// Access token for the server
    #[arg(long)]
    token: Option<String>,

    /// Send NMEA 2000 messages to this Actisense TCP gateway
    #[arg(long)]
    n2k_tcp: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(path) = &self.plugin_config {
            config.plugin_config = path.clone();
        }
        if let Some(url) = &self.server_url {
            config.server.url = url.clone();
        }
        if let Some(token) = &self.token {
            config.server.token = Some(token.clone());
        }
        if let Some(address) = &self.n2k_tcp {
            config.n2k = N2kOutputConfig::Tcp {
                address: address.clone(),
            };
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let mut config = RuntimeConfig::load(args.config.as_deref()).context("Failed to load runtime configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid runtime configuration")?;

    let rules = load_plugin_config(&config.plugin_config).context("Failed to load notification rules")?;

    info!(
        server = %config.server.url,
        rules = rules.notifications.len(),
        "Starting notification acker"
    );

    let runtime = AckerRuntime::new(&config);
    runtime.start(&rules).await?;

    info!("Acker is running. Press Ctrl+C to stop.");
    let mut hangup = Hangup::new().context("Failed to install SIGHUP handler")?;
    let client_exit = loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break None;
            }
            exit = runtime.client_stopped() => {
                error!(exit = %exit, "Signal K client stopped, shutting down");
                break Some(exit);
            }
            Some(()) = hangup.recv() => {
                match load_plugin_config(&config.plugin_config) {
                    Ok(rules) => {
                        if let Err(e) = runtime.reload(&rules).await {
                            error!(error = %e, "Reload failed");
                        }
                    }
                    Err(e) => error!(error = %e, "Keeping current rules"),
                }
            }
        }
    };

    // Graceful shutdown
    runtime.shutdown().await;

    // Non-zero exit so a supervisor restarts the process
    if let Some(exit) = client_exit {
        bail!("Signal K client {exit}");
    }
    Ok(())
}
