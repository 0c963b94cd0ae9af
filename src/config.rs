//! Configuration types for cc-ticker

use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// CryptoCompare streamer endpoint (protocol v2)
pub const DEFAULT_STREAM_URL: &str = "wss://streamer.cryptocompare.com/v2";

/// CryptoCompare REST API base
pub const DEFAULT_SNAPSHOT_BASE_URL: &str = "https://min-api.cryptocompare.com";

/// Environment variable holding the API key unless configured otherwise
pub const DEFAULT_API_KEY_ENV: &str = "CRYPTOCOMPARE_API_KEY";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Credential variable unset or blank
    #[error("API key not found: set the {var} environment variable")]
    MissingApiKey { var: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub stream: StreamConfig,
    pub snapshot: SnapshotConfig,
    pub telemetry: TelemetryConfig,
}

/// Where the API key comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Name of the environment variable holding the key
    pub api_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

/// Streaming connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Streamer URL without credentials
    pub url: String,
    /// Consecutive failed reconnects before giving up (0 = never give up)
    pub max_reconnect_attempts: u32,
    pub initial_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    /// 0 disables keepalive pings
    pub ping_interval_secs: u64,
    pub pong_timeout_secs: u64,
    /// Inbound frames buffered between the transport and the ticker
    pub inbound_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 60_000,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            inbound_buffer: 1024,
        }
    }
}

impl StreamConfig {
    /// Endpoint URL with the credential attached
    pub fn endpoint(&self, api_key: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}api_key={}", self.url, separator, api_key)
    }

    /// Transport settings for this stream
    pub fn ws_config(&self, api_key: &str) -> WsConfig {
        WsConfig::new(self.endpoint(api_key))
            .max_reconnects(self.max_reconnect_attempts)
            .initial_delay(Duration::from_millis(self.initial_reconnect_delay_ms))
            .max_delay(Duration::from_millis(self.max_reconnect_delay_ms))
            .ping_interval(Duration::from_secs(self.ping_interval_secs))
            .pong_timeout(Duration::from_secs(self.pong_timeout_secs))
            .inbound_buffer(self.inbound_buffer)
    }
}

/// Batch price endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub base_url: String,
    /// Request timeout; none by default
    pub timeout_secs: Option<u64>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl SnapshotConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let var = &self.credentials.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingApiKey { var: var.clone() }),
        }
    }
}
