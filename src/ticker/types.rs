//! Ticker domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Quote currency every price is denominated in
pub const QUOTE_CURRENCY: &str = "USD";

/// Currency identifier, e.g. "BTC". Compared by exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Symbol> for Symbol {
    fn from(s: &Symbol) -> Self {
        s.clone()
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Callback invoked with the latest price of a subscribed symbol
pub type PriceCallback = Arc<dyn Fn(Decimal) + Send + Sync + 'static>;

/// A callback panicked while handling a price update
#[derive(Debug, Clone)]
pub struct CallbackFault {
    /// Symbol whose update was being delivered
    pub symbol: Symbol,
    /// Position of the callback in the symbol's registration order
    pub callback_index: usize,
    /// Panic payload, when it was a string
    pub message: String,
    /// When the fault was caught
    pub at: DateTime<Utc>,
}

/// Lifecycle of the streaming connection as seen by the ticker client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Waiting for the first session
    Connecting,
    /// A session is open; control messages go straight out
    Ready,
    /// Session lost, transport is backing off
    Reconnecting,
    /// Transport gave up or was shut down
    Closed,
}

/// Counters kept by the ticker client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerStats {
    /// Price updates handed to at least one callback
    pub dispatched: u64,
    /// Individual callback invocations
    pub callbacks_invoked: u64,
    /// Callbacks that panicked
    pub callback_faults: u64,
    /// Frames that were not valid JSON or lacked `TYPE`
    pub discarded_malformed: u64,
    /// Frames with a `TYPE` other than the aggregate index
    pub discarded_other_type: u64,
    /// Aggregate index frames for symbols with no callbacks
    pub discarded_unsubscribed: u64,
    /// Aggregate index frames that carried no price
    pub discarded_no_price: u64,
    /// Control messages written to the transport
    pub control_sent: u64,
    /// Control messages parked while the connection was not ready
    pub control_queued: u64,
    /// Queued control messages dropped before they were sent
    pub control_cancelled: u64,
    /// Sessions established
    pub connects: u64,
    /// Sessions lost
    pub reconnects: u64,
}
