//! CryptoCompare `pricemulti` client
//!
//! One GET per call: `/data/pricemulti?fsyms=BTC,ETH&tsyms=USD&api_key=...`
//! answers `{"BTC":{"USD":50000},"ETH":{"USD":3000}}`, which is flattened to
//! symbol → USD price. Symbols the API does not know are simply missing.

use super::{PriceMap, SnapshotError};
use crate::config::SnapshotConfig;
use crate::telemetry::{self, CounterMetric};
use crate::ticker::{Symbol, QUOTE_CURRENCY};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Batch price lookup against the REST API
pub struct SnapshotPriceFetcher {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SnapshotPriceFetcher {
    /// Create a fetcher; applies the configured timeout, if any
    pub fn new(
        config: &SnapshotConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, SnapshotError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SnapshotError::Request(e.without_url()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Base URL requests go to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current USD price of every symbol in one request
    ///
    /// Unknown symbols are absent from the result. Failures are returned as-is;
    /// nothing is retried.
    pub async fn load_tickers(&self, symbols: &[Symbol]) -> Result<PriceMap, SnapshotError> {
        if symbols.is_empty() {
            return Err(SnapshotError::NoSymbols);
        }

        let fsyms = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        telemetry::increment(CounterMetric::SnapshotRequest, 1);
        let result = self.fetch(&fsyms).await;

        match &result {
            Ok(prices) => {
                tracing::debug!(
                    requested = symbols.len(),
                    returned = prices.len(),
                    "Loaded price snapshot"
                );
            }
            Err(e) => {
                telemetry::increment(CounterMetric::SnapshotFailure, 1);
                tracing::warn!(error = %e, symbols = %fsyms, "Price snapshot failed");
            }
        }

        result
    }

    async fn fetch(&self, fsyms: &str) -> Result<PriceMap, SnapshotError> {
        let url = format!("{}/data/pricemulti", self.base_url);

        tracing::debug!(url = %url, fsyms, "Fetching price snapshot");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fsyms", fsyms),
                ("tsyms", QUOTE_CURRENCY),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SnapshotError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SnapshotError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SnapshotError::Request(e.without_url()))?;

        parse_price_multi(&body)
    }
}

/// Error envelope the API returns with a 200 status
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Response")]
    #[allow(dead_code)]
    response: ErrorMarker,
    #[serde(rename = "Message", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
enum ErrorMarker {
    Error,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceMultiResponse {
    Error(ApiErrorBody),
    Prices(HashMap<String, HashMap<String, Decimal>>),
}

/// Flatten a `pricemulti` body into symbol → quote-currency price
pub fn parse_price_multi(body: &str) -> Result<PriceMap, SnapshotError> {
    match serde_json::from_str::<PriceMultiResponse>(body)? {
        PriceMultiResponse::Error(err) => Err(SnapshotError::Api(err.message)),
        PriceMultiResponse::Prices(prices) => Ok(prices
            .into_iter()
            .filter_map(|(symbol, quotes)| {
                quotes
                    .get(QUOTE_CURRENCY)
                    .map(|price| (Symbol::from(symbol), *price))
            })
            .collect()),
    }
}
