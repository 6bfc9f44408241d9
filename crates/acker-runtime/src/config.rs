//! # Runtime Configuration
//!
//! Loaded in layers, each overriding the previous one:
//!
//! 1. Built-in defaults
//! 2. JSON runtime configuration file (`--config`)
//! 3. Environment (`ACKER_SERVER_URL`, `ACKER_TOKEN`, `ACKER_N2K_TCP`, `ACKER_SOURCE_ID`)
//! 4. Command line flags
//!
//! The rule list itself lives in a separate plugin configuration file, in
//! the Signal K server's `plugin-config-data` format.

use std::path::{Path, PathBuf};

use notification_acker::{AckerConfig, AckerSettings, PLUGIN_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ConfigError;

/// Server URL used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3000/signalk/v1/stream?subscribe=none";

/// Environment variable overriding the server URL.
pub const ENV_SERVER_URL: &str = "ACKER_SERVER_URL";
/// Environment variable carrying the access token.
pub const ENV_TOKEN: &str = "ACKER_TOKEN";
/// Environment variable selecting TCP NMEA 2000 output.
pub const ENV_N2K_TCP: &str = "ACKER_N2K_TCP";
/// Environment variable overriding the source id.
pub const ENV_SOURCE_ID: &str = "ACKER_SOURCE_ID";

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Signal K server connection.
    pub server: ServerConfig,
    /// Where `nmea2000out` lines go.
    pub n2k: N2kOutputConfig,
    /// Acker instance settings.
    pub acker: AckerSettings,
    /// Plugin configuration file with the rule list.
    pub plugin_config: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            n2k: N2kOutputConfig::default(),
            acker: AckerSettings::default(),
            plugin_config: PathBuf::from(format!("plugin-config-data/{PLUGIN_ID}.json")),
        }
    }
}

/// Signal K server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket stream URL.
    pub url: String,
    /// Bearer token sent on connect.
    pub token: Option<String>,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Exponential backoff for reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Consecutive failed attempts before giving up. Zero retries forever.
    pub max_attempts: u32,
    /// Delay after the first failure, doubled per failure.
    pub base_delay_secs: u64,
    /// Upper bound for the delay.
    pub max_delay_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_secs: 2,
            max_delay_secs: 60,
        }
    }
}

/// NMEA 2000 output channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum N2kOutputConfig {
    /// Log every line.
    #[default]
    Log,
    /// Write lines to an Actisense-format TCP gateway.
    Tcp { address: String },
}

impl RuntimeConfig {
    /// Defaults, overlaid with `path` when given, then with the environment.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` or `ConfigError::Parse` for a bad file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a runtime configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            what: path.display().to_string(),
            source,
        })
    }

    /// Apply environment overrides, looking variables up with `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server.url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.server.token = Some(token);
        }
        if let Some(address) = lookup(ENV_N2K_TCP) {
            self.n2k = N2kOutputConfig::Tcp { address };
        }
        if let Some(source_id) = lookup(ENV_SOURCE_ID) {
            self.acker.source_id = source_id;
        }
    }

    /// Check the configuration can be used.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server.url.starts_with("ws://") || self.server.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidServerUrl(self.server.url.clone()));
        }
        if let N2kOutputConfig::Tcp { address } = &self.n2k {
            if address.trim().is_empty() {
                return Err(ConfigError::EmptyTcpAddress);
            }
        }
        if self.acker.source_id.trim().is_empty() {
            return Err(ConfigError::EmptySourceId);
        }
        Ok(())
    }
}

/// Stored plugin configuration as written by a Signal K server.
#[derive(Debug, Deserialize)]
struct PluginConfigData {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    configuration: AckerConfig,
}

fn enabled_by_default() -> bool {
    true
}

/// Decode a plugin configuration document.
///
/// Accepts `{"enabled": .., "configuration": {"notifications": [..]}}` or a
/// bare `{"notifications": [..]}`. A disabled plugin yields no rules.
///
/// # Errors
///
/// `ConfigError::Parse` when the document has neither shape.
pub fn parse_plugin_config(text: &str) -> Result<AckerConfig, ConfigError> {
    let parse_error = |source| ConfigError::Parse {
        what: "plugin configuration".to_string(),
        source,
    };

    let value: Value = serde_json::from_str(text).map_err(parse_error)?;
    if value.get("configuration").is_none() {
        return serde_json::from_value(value).map_err(parse_error);
    }

    let data: PluginConfigData = serde_json::from_value(value).map_err(parse_error)?;
    if !data.enabled {
        info!("Plugin is disabled in its configuration, no rules loaded");
        return Ok(AckerConfig::default());
    }
    Ok(data.configuration)
}

/// Read and decode a plugin configuration file.
///
/// # Errors
///
/// `ConfigError::Read` or `ConfigError::Parse`.
pub fn load_plugin_config(path: &Path) -> Result<AckerConfig, ConfigError> {
    parse_plugin_config(&read(path)?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
