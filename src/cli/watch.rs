//! Watch command implementation

use super::parse_symbols;
use crate::config::Config;
use crate::ticker::{ConnectionPhase, StreamingTickerClient};
use chrono::Utc;
use clap::Args;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Symbols to follow, e.g. BTC ETH (comma-separated also accepted)
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbols = parse_symbols(&self.symbols);
        anyhow::ensure!(!symbols.is_empty(), "no symbols given");

        let api_key = config.api_key()?;
        let client = StreamingTickerClient::connect(&config.stream, &api_key);

        for symbol in &symbols {
            let label = symbol.clone();
            client.subscribe_to_ticker(symbol, move |price| {
                println!(
                    "{}  {:<6} {}",
                    Utc::now().format("%H:%M:%S%.3f"),
                    label,
                    price
                );
            });
        }

        let mut faults = client.faults();
        let mut health = tokio::time::interval(Duration::from_secs(1));
        let mut closed = false;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, shutting down");
                    break;
                }
                fault = faults.recv() => match fault {
                    Ok(fault) => tracing::warn!(
                        symbol = %fault.symbol,
                        callback = fault.callback_index,
                        message = %fault.message,
                        "Price callback panicked"
                    ),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Fault reports dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = health.tick() => {
                    if client.phase() == ConnectionPhase::Closed {
                        closed = true;
                        break;
                    }
                }
            }
        }

        let stats = client.stats();
        tracing::info!(
            dispatched = stats.dispatched,
            connects = stats.connects,
            reconnects = stats.reconnects,
            discarded_malformed = stats.discarded_malformed,
            discarded_other_type = stats.discarded_other_type,
            "Ticker stopped"
        );
        client.shutdown().await;

        if closed {
            anyhow::bail!("stream closed after exhausting reconnect attempts");
        }
        Ok(())
    }
}
