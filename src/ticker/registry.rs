//! Symbol → callbacks registry

use super::types::{CallbackFault, PriceCallback, Symbol};
use chrono::Utc;
use rust_decimal::Decimal;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of delivering one price update
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Callbacks that returned normally
    pub delivered: usize,
    /// Callbacks that panicked
    pub faults: Vec<CallbackFault>,
}

impl Dispatch {
    /// Total callbacks invoked
    pub fn invoked(&self) -> usize {
        self.delivered + self.faults.len()
    }
}

/// Callbacks per symbol, in registration order
///
/// A symbol with no callbacks is never kept as an empty entry.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<Symbol, Vec<PriceCallback>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback; returns how many callbacks the symbol now has
    pub fn add(&mut self, symbol: Symbol, callback: PriceCallback) -> usize {
        let callbacks = self.entries.entry(symbol).or_default();
        callbacks.push(callback);
        callbacks.len()
    }

    /// Drop every callback for `symbol`; returns how many were dropped
    pub fn remove(&mut self, symbol: &Symbol) -> usize {
        self.entries.remove(symbol).map_or(0, |callbacks| callbacks.len())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn callback_count(&self, symbol: &Symbol) -> usize {
        self.entries.get(symbol).map_or(0, Vec::len)
    }

    /// Number of subscribed symbols
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribed symbols in sorted order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.keys()
    }

    /// Invoke every callback for `symbol` in registration order
    ///
    /// Each call runs behind its own unwind boundary, so a panicking callback
    /// is recorded as a fault and the remaining callbacks still run.
    pub fn dispatch(&self, symbol: &Symbol, price: Decimal) -> Dispatch {
        let mut outcome = Dispatch::default();
        let Some(callbacks) = self.entries.get(symbol) else {
            return outcome;
        };

        for (index, callback) in callbacks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(price))) {
                Ok(()) => outcome.delivered += 1,
                Err(payload) => outcome.faults.push(CallbackFault {
                    symbol: symbol.clone(),
                    callback_index: index,
                    message: panic_message(&*payload),
                    at: Utc::now(),
                }),
            }
        }

        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}
