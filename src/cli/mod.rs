//! CLI interface for cc-ticker
//!
//! Provides subcommands for:
//! - `watch`: Stream live prices until interrupted
//! - `snapshot`: Print current prices once
//! - `config`: Show effective configuration

mod snapshot;
mod watch;

pub use snapshot::{OutputFormat, SnapshotArgs};
pub use watch::WatchArgs;

use crate::ticker::Symbol;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cc-ticker")]
#[command(about = "CryptoCompare live ticker and price snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream live prices until Ctrl-C
    Watch(WatchArgs),
    /// Fetch current prices once
    Snapshot(SnapshotArgs),
    /// Show effective configuration
    Config,
}

/// Normalise command-line symbols; tickers are upper-case upstream
fn parse_symbols(raw: &[String]) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::with_capacity(raw.len());
    for s in raw.iter().flat_map(|arg| arg.split(',')) {
        let s = s.trim();
        if s.is_empty() {
            continue;
        }
        let symbol = Symbol::from(s.to_uppercase());
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
