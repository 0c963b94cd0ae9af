//! Price snapshot module
//!
//! One-shot batch price lookup for a set of symbols

mod fetcher;

pub use fetcher::{parse_price_multi, SnapshotPriceFetcher};

use crate::ticker::Symbol;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Symbol → price in the quote currency
pub type PriceMap = HashMap<Symbol, Decimal>;

/// Snapshot errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Called with an empty symbol list
    #[error("No symbols requested")]
    NoSymbols,
    /// Transport failure (URL stripped, it carries the API key)
    #[error("Request failed: {0}")]
    Request(reqwest::Error),
    /// Non-success HTTP status
    #[error("Price API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Error reported in the response body
    #[error("Price API error: {0}")]
    Api(String),
    /// Body was not a price map
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Trait for batch price sources
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Current price of each symbol; unknown symbols are left out
    async fn load_tickers(&self, symbols: &[Symbol]) -> Result<PriceMap, SnapshotError>;
}

#[async_trait]
impl SnapshotSource for SnapshotPriceFetcher {
    async fn load_tickers(&self, symbols: &[Symbol]) -> Result<PriceMap, SnapshotError> {
        SnapshotPriceFetcher::load_tickers(self, symbols).await
    }
}
