//! YAML settings for the chat binaries
//!
//! ```yaml
//! url: http://localhost:8080/jocket/chat/simple
//! transports: [websocket, polling]
//! handshake_timeout_ms: 5000
//! heartbeat_interval_ms: 25000
//! auto_reconnect: true
//! reconnect:
//!   initial_delay_ms: 1000
//!   max_delay_ms: 30000
//!   max_attempts: 10
//! headers:
//!   X-Chat-User: alice
//! ```

use jocket::builder::states::HasUrl;
use jocket::{ExponentialBackoff, JocketBuilder, ProtocolProfile, StaticHeaders, TransportKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid settings: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Environment variable overriding `url`
pub const URL_ENV_VAR: &str = "JOCKET_URL";

/// Client settings for the chat binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JocketSettings {
    /// Base URL of the Jocket endpoint
    pub url: String,
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,
    #[serde(default)]
    pub profile: ProtocolProfile,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Close with a ping timeout when a heartbeat stays unanswered this long
    #[serde(default)]
    pub pong_timeout_ms: Option<u64>,
    #[serde(default)]
    pub auto_reconnect: bool,
    #[serde(default)]
    pub reconnect: Option<ReconnectSettings>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Exponential backoff parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default)]
    pub max_attempts: Option<usize>,
}

fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::WebSocket, TransportKind::Polling]
}

fn default_handshake_timeout_ms() -> u64 {
    5_000
}

fn default_heartbeat_interval_ms() -> u64 {
    25_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl JocketSettings {
    /// Load settings from a YAML file
    ///
    /// Reads `.env` first; `JOCKET_URL` overrides the file's `url`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let yaml_content = std::fs::read_to_string(path)?;
        let mut settings: JocketSettings = serde_yaml::from_str(&yaml_content)?;

        if let Ok(url) = std::env::var(URL_ENV_VAR) {
            info!("Overriding url from {}", URL_ENV_VAR);
            settings.url = url;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings without touching the environment
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: JocketSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SettingsError::ValidationError(
                "url must not be empty".to_string(),
            ));
        }

        if self.profile == ProtocolProfile::Multi && self.transports.is_empty() {
            return Err(SettingsError::ValidationError(
                "transports must list at least one transport".to_string(),
            ));
        }

        if self.handshake_timeout_ms == 0 {
            return Err(SettingsError::ValidationError(
                "handshake_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(SettingsError::ValidationError(
                "heartbeat_interval_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(reconnect) = &self.reconnect {
            if reconnect.initial_delay_ms > reconnect.max_delay_ms {
                return Err(SettingsError::ValidationError(
                    "reconnect.initial_delay_ms must not exceed reconnect.max_delay_ms".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Configure a client builder from these settings
    pub fn builder(&self) -> JocketBuilder<HasUrl> {
        let mut builder = jocket::builder()
            .url(self.url.clone())
            .transports(self.transports.iter().copied())
            .profile(self.profile)
            .handshake_timeout(Duration::from_millis(self.handshake_timeout_ms))
            .heartbeat_interval(Duration::from_millis(self.heartbeat_interval_ms))
            .auto_reconnect(self.auto_reconnect);

        if let Some(ms) = self.pong_timeout_ms {
            builder = builder.pong_timeout(Duration::from_millis(ms));
        }

        if let Some(reconnect) = &self.reconnect {
            builder = builder.reconnect_strategy(ExponentialBackoff::new(
                Duration::from_millis(reconnect.initial_delay_ms),
                Duration::from_millis(reconnect.max_delay_ms),
                reconnect.max_attempts,
            ));
        }

        if !self.headers.is_empty() {
            builder = builder.headers(StaticHeaders::new(self.headers.clone()));
        }

        builder
    }

    /// Log a one-line summary of the effective settings
    pub fn log_summary(&self) {
        info!(
            "url={} transports={:?} profile={:?} heartbeat={}ms reconnect={}",
            self.url,
            self.transports,
            self.profile,
            self.heartbeat_interval_ms,
            self.auto_reconnect
        );
    }
}
