use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{BotError, Result};

/// Candle interval supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    EightHours,
    TwelveHours,
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::FourHours,
        Interval::EightHours,
        Interval::TwelveHours,
        Interval::OneDay,
    ];

    /// Wire name used in exchange query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "60m",
            Interval::FourHours => "4h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
        }
    }

    pub fn is_sub_daily(&self) -> bool {
        !matches!(self, Interval::OneDay)
    }

    /// Minimum history length required before a series is usable.
    ///
    /// Sub-daily series feed the EMA stack (slow window 200); daily series
    /// only feed the retracement window.
    pub fn min_candles(&self) -> usize {
        if self.is_sub_daily() {
            200
        } else {
            40
        }
    }
}

impl FromStr for Interval {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| BotError::Validation(format!("unsupported interval: {}", s)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Interval::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A tradable pair as listed by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub tradable: bool,
    /// Decimal places accepted for base-asset quantities
    pub base_precision: u32,
    /// Smallest order value in quote currency
    pub min_notional: Decimal,
}

/// OHLCV candlestick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Ordered candle history for one symbol and interval
#[derive(Debug, Clone)]
pub struct CandleSeries {
    pub symbol: String,
    pub interval: Interval,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, rejecting out-of-order or duplicate timestamps
    pub fn new(symbol: String, interval: Interval, candles: Vec<Candle>) -> Result<Self> {
        for window in candles.windows(2) {
            if window[1].open_time <= window[0].open_time {
                return Err(BotError::Validation(format!(
                    "candles for {} are not strictly ordered at {}",
                    symbol, window[1].open_time
                )));
            }
        }
        Ok(Self {
            symbol,
            interval,
            candles,
        })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Latest closed candle (the most recent candle is still forming)
    pub fn last_closed(&self) -> Option<&Candle> {
        let n = self.candles.len();
        if n < 2 {
            return None;
        }
        Some(&self.candles[n - 2])
    }

    /// Closed candle before [`Self::last_closed`]
    pub fn prior_closed(&self) -> Option<&Candle> {
        let n = self.candles.len();
        if n < 3 {
            return None;
        }
        Some(&self.candles[n - 3])
    }
}

/// Trading signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Market order request, constructed per call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    /// Base-asset quantity (sells)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    /// Quote-currency value (buys)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_notional: Option<Decimal>,
    pub client_order_id: Uuid,
}

impl OrderRequest {
    pub fn market_buy(symbol: &str, quote_notional: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: OrderSide::Buy.as_str(),
            order_type: "MARKET",
            quantity: None,
            quote_notional: Some(quote_notional),
            client_order_id: Uuid::new_v4(),
        }
    }

    pub fn market_sell(symbol: &str, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: OrderSide::Sell.as_str(),
            order_type: "MARKET",
            quantity: Some(quantity),
            quote_notional: None,
            client_order_id: Uuid::new_v4(),
        }
    }
}

/// Exchange acknowledgement of an order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: i64,
    pub success: bool,
}
