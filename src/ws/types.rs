//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum consecutive reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Initial delay before first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,
    /// Interval for sending ping frames; zero disables keepalive
    pub ping_interval: Duration,
    /// How long a ping may stay unanswered before the session is dropped
    pub pong_timeout: Duration,
    /// Capacity of the inbound event channel
    pub inbound_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            inbound_buffer: 1024,
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Set pong timeout
    pub fn pong_timeout(mut self, d: Duration) -> Self {
        self.pong_timeout = d;
        self
    }

    /// Set the inbound event channel capacity
    pub fn inbound_buffer(mut self, n: usize) -> Self {
        self.inbound_buffer = n.max(1);
        self
    }

    /// URL with any `api_key` query value masked, for logging
    pub fn redacted_url(&self) -> String {
        redact_api_key(&self.url)
    }
}

/// Mask the value of an `api_key` query parameter
pub(crate) fn redact_api_key(url: &str) -> String {
    let Some(start) = url.find("api_key=") else {
        return url.to_string();
    };
    let value_start = start + "api_key=".len();
    let value_end = url[value_start..]
        .find('&')
        .map(|i| value_start + i)
        .unwrap_or(url.len());
    format!("{}***{}", &url[..value_start], &url[value_end..])
}

/// WebSocket message types
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Connection established (sent for the first session and every reconnect)
    Connected { session: u64 },
    /// Connection closed for good; no further events follow
    Disconnected,
    /// Session lost, reconnecting after backoff
    Reconnecting { attempt: u32 },
}

/// Text frame addressed to one session
///
/// Frames whose `session` is not the one currently open are dropped by the
/// transport instead of leaking into a newer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub session: u64,
    pub text: String,
}

impl OutboundFrame {
    pub fn new(session: u64, text: impl Into<String>) -> Self {
        Self {
            session,
            text: text.into(),
        }
    }
}

/// WebSocket errors
#[derive(Debug, Clone, Error)]
pub enum WsError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Server closed the session
    #[error("Connection closed by server")]
    ClosedByServer,
    /// Ping went unanswered
    #[error("Pong timeout")]
    PongTimeout,
    /// Maximum reconnection attempts exceeded
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
}
