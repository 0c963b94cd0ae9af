//! cc-ticker: CryptoCompare price client
//!
//! This library provides:
//! - Live aggregate-index prices over the streamer WebSocket, fanned out to
//!   per-symbol callbacks
//! - Batch price snapshots from the REST `pricemulti` endpoint
//! - Reconnecting WebSocket transport
//! - Logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod snapshot;
pub mod telemetry;
pub mod ticker;
pub mod ws;
