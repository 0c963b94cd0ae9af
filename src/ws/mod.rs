//! Streaming transport
//!
//! A text-frame WebSocket session that survives drops: it reconnects with
//! exponential backoff, keeps the link alive with pings, and reports every
//! session change as a [`WsMessage`] so the layer above can resubscribe.

mod client;
mod types;

pub use client::WsClient;
pub use types::{OutboundFrame, WsConfig, WsError, WsMessage};
