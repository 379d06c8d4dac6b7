use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Entry record for a tracked open position
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    /// Exchange id of the entry order
    pub order_id: i64,
    /// Filled-quantity estimate at entry
    pub quantity: Decimal,
    pub opened_at: DateTime<Utc>,
}

/// Per-symbol position state, owned by the order executor.
///
/// Process-local and in-memory: a restart starts from an empty store and
/// never re-derives open positions from the exchange.
#[derive(Debug, Default)]
pub struct PositionStore {
    open: HashMap<String, OpenPosition>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.open.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&OpenPosition> {
        self.open.get(symbol)
    }

    /// Record a freshly opened position; only called after a successful buy
    pub fn open(&mut self, symbol: &str, position: OpenPosition) {
        self.open.insert(symbol.to_string(), position);
    }

    /// Drop the tracked position after a full exit
    pub fn clear(&mut self, symbol: &str) -> Option<OpenPosition> {
        self.open.remove(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_symbols(&self) -> Vec<&str> {
        self.open.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(order_id: i64) -> OpenPosition {
        OpenPosition {
            order_id,
            quantity: dec!(0.5),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_and_clear() {
        let mut store = PositionStore::new();
        assert!(!store.is_open("BTCUSDT"));

        store.open("BTCUSDT", position(1));
        assert!(store.is_open("BTCUSDT"));
        assert_eq!(store.get("BTCUSDT").unwrap().order_id, 1);
        assert_eq!(store.open_count(), 1);

        let cleared = store.clear("BTCUSDT").unwrap();
        assert_eq!(cleared.order_id, 1);
        assert!(!store.is_open("BTCUSDT"));
        assert!(store.get("BTCUSDT").is_none());
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut store = PositionStore::new();
        store.open("BTCUSDT", position(1));
        store.open("ETHUSDT", position(2));

        store.clear("BTCUSDT");
        assert!(!store.is_open("BTCUSDT"));
        assert!(store.is_open("ETHUSDT"));
    }

    #[test]
    fn test_clear_unknown_symbol_is_none() {
        let mut store = PositionStore::new();
        assert!(store.clear("BTCUSDT").is_none());
    }
}
