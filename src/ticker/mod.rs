//! Live ticker module
//!
//! Subscribes to CryptoCompare aggregate index (CCCAGG) prices over the
//! streamer WebSocket and fans each update out to per-symbol callbacks.

mod client;
mod messages;
mod queue;
mod registry;
mod types;

pub use client::StreamingTickerClient;
pub use messages::{
    subscription_key, ControlMessage, Inbound, SubAction, AGGREGATE_EXCHANGE, AGGREGATE_INDEX,
};
pub use queue::{Enqueued, OutboundQueue};
pub use registry::{Dispatch, SubscriptionRegistry};
pub use types::{
    CallbackFault, ConnectionPhase, PriceCallback, Symbol, TickerStats, QUOTE_CURRENCY,
};
