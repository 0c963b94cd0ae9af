//! Streamer wire format
//!
//! Outbound control frames look like
//! `{"action":"SubAdd","subs":["5~CCCAGG~BTC~USD"]}`; inbound frames are flat
//! JSON objects keyed by upper-case field names, of which only `TYPE`,
//! `FROMSYMBOL` and `PRICE` matter for price delivery.

use super::types::{Symbol, QUOTE_CURRENCY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `TYPE` of aggregate index (CCCAGG) price updates
pub const AGGREGATE_INDEX: &str = "5";

/// Exchange tag of the aggregated index
pub const AGGREGATE_EXCHANGE: &str = "CCCAGG";

/// Subscription action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubAction {
    SubAdd,
    SubRemove,
}

/// Outbound control message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlMessage {
    pub action: SubAction,
    pub subs: Vec<String>,
    #[serde(skip)]
    symbol: Symbol,
}

impl ControlMessage {
    /// Start aggregate index updates for `symbol`
    pub fn add(symbol: &Symbol) -> Self {
        Self::new(SubAction::SubAdd, symbol)
    }

    /// Stop aggregate index updates for `symbol`
    pub fn remove(symbol: &Symbol) -> Self {
        Self::new(SubAction::SubRemove, symbol)
    }

    fn new(action: SubAction, symbol: &Symbol) -> Self {
        Self {
            action,
            subs: vec![subscription_key(symbol)],
            symbol: symbol.clone(),
        }
    }

    /// Symbol the message is about
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn is_add(&self) -> bool {
        self.action == SubAction::SubAdd
    }

    /// Serialize to the wire text format
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Subscription string for the aggregate index of `symbol` against the quote currency
pub fn subscription_key(symbol: &Symbol) -> String {
    format!(
        "{}~{}~{}~{}",
        AGGREGATE_INDEX, AGGREGATE_EXCHANGE, symbol, QUOTE_CURRENCY
    )
}

/// Raw inbound frame; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "TYPE")]
    pub kind: String,
    #[serde(rename = "FROMSYMBOL")]
    pub from_symbol: Option<Symbol>,
    #[serde(rename = "TOSYMBOL")]
    pub to_symbol: Option<String>,
    #[serde(rename = "PRICE")]
    pub price: Option<Decimal>,
    #[serde(rename = "LASTUPDATE")]
    pub last_update: Option<i64>,
    #[serde(rename = "MESSAGE")]
    pub message: Option<String>,
    #[serde(rename = "INFO")]
    pub info: Option<String>,
}

/// What an inbound frame means to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Aggregate index price for a symbol
    Price { symbol: Symbol, price: Decimal },
    /// Aggregate index frame without a price (volume-only change)
    NoPrice { symbol: Symbol },
    /// Any other frame type: welcome, heartbeat, subscription acks, errors
    Other { kind: String, detail: Option<String> },
    /// Not JSON, or missing the fields we key on
    Malformed,
}

impl Inbound {
    /// Decode and classify one text frame
    pub fn parse(text: &str) -> Self {
        let Ok(msg) = serde_json::from_str::<InboundMessage>(text) else {
            return Inbound::Malformed;
        };

        if msg.kind != AGGREGATE_INDEX {
            return Inbound::Other {
                detail: msg.message.or(msg.info),
                kind: msg.kind,
            };
        }

        match (msg.from_symbol, msg.price) {
            (Some(symbol), Some(price)) => Inbound::Price { symbol, price },
            (Some(symbol), None) => Inbound::NoPrice { symbol },
            (None, _) => Inbound::Malformed,
        }
    }
}

/// Whether a non-price `TYPE` reports an upstream error (auth, rate limit, bad sub)
pub fn is_error_type(kind: &str) -> bool {
    match kind.parse::<u16>() {
        Ok(code) => (400..999).contains(&code),
        Err(_) => false,
    }
}

/// Human name of the streamer's status `TYPE`s, for logs
pub fn describe_type(kind: &str) -> &'static str {
    match kind {
        "3" => "LOADCOMPLETE",
        "16" => "SUBSCRIBECOMPLETE",
        "17" => "UNSUBSCRIBECOMPLETE",
        "18" => "UNSUBSCRIBEALLCOMPLETE",
        "20" => "STREAMERWELCOME",
        "401" => "UNAUTHORIZED",
        "429" => "RATE_LIMIT",
        "500" => "ERROR",
        "999" => "HEARTBEAT",
        _ => "UNKNOWN",
    }
}
