//! Snapshot command implementation

use super::parse_symbols;
use crate::config::Config;
use crate::snapshot::{PriceMap, SnapshotPriceFetcher, SnapshotSource};
use crate::ticker::{Symbol, QUOTE_CURRENCY};
use clap::{Args, ValueEnum};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Symbols to price, e.g. BTC ETH (comma-separated also accepted)
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SnapshotArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let api_key = config.api_key()?;
        let fetcher = SnapshotPriceFetcher::new(&config.snapshot, api_key)?;
        let output = self.run(&fetcher).await?;
        print!("{}", output);
        Ok(())
    }

    /// Fetch from `source` and render in the requested format
    pub async fn run(&self, source: &dyn SnapshotSource) -> anyhow::Result<String> {
        let symbols = parse_symbols(&self.symbols);
        let prices = source.load_tickers(&symbols).await?;

        let missing = symbols.iter().filter(|s| !prices.contains_key(*s)).count();
        if missing > 0 {
            tracing::info!(missing, "Some symbols had no price");
        }

        render(&symbols, &prices, self.format)
    }
}

/// Table keeps request order and marks missing symbols; JSON holds only priced ones
pub fn render(
    symbols: &[Symbol],
    prices: &PriceMap,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let ordered: BTreeMap<&str, _> =
                prices.iter().map(|(s, p)| (s.as_str(), p)).collect();
            Ok(serde_json::to_string_pretty(&ordered)? + "\n")
        }
        OutputFormat::Table => {
            let mut out = String::new();
            writeln!(out, "{:<8} {:>16}", "SYMBOL", QUOTE_CURRENCY)?;
            for symbol in symbols {
                match prices.get(symbol) {
                    Some(price) => writeln!(out, "{:<8} {:>16}", symbol.as_str(), price)?,
                    None => writeln!(out, "{:<8} {:>16}", symbol.as_str(), "-")?,
                }
            }
            Ok(out)
        }
    }
}
