use chrono::{TimeZone, Utc};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::api::SignedClient;
use crate::error::{BotError, Result};
use crate::models::{Candle, CandleSeries, Interval, SymbolInfo};

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ExchangeInfoRaw {
    symbols: Vec<SymbolRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolRaw {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
    base_precision: u32,
    min_notional: Decimal,
}

/// Kline row: [open time ms, open, high, low, close, volume]
type KlineRow = (i64, Decimal, Decimal, Decimal, Decimal, Decimal);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerRaw {
    bid_price: Decimal,
    ask_price: Decimal,
}

#[derive(Debug, Deserialize)]
struct BalanceRaw {
    #[allow(dead_code)]
    asset: String,
    free: Decimal,
}

// ============== Implementation ==============

/// Read side of the exchange API: symbols, candles, order book, balances
#[derive(Clone)]
pub struct MarketData {
    client: SignedClient,
}

impl MarketData {
    pub fn new(client: SignedClient) -> Self {
        Self { client }
    }

    /// List pairs quoted in `quote_asset` that are currently tradable.
    ///
    /// Called once at startup; the universe is not refreshed afterwards.
    pub async fn fetch_symbols(&self, quote_asset: &str) -> Result<Vec<SymbolInfo>> {
        let info: ExchangeInfoRaw = self
            .client
            .execute(Method::GET, "/api/v1/exchangeInfo", &[], None)
            .await?;

        let symbols = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING" && s.quote_asset == quote_asset)
            .map(|s| SymbolInfo {
                symbol: s.symbol,
                base_asset: s.base_asset,
                quote_asset: s.quote_asset,
                tradable: true,
                base_precision: s.base_precision,
                min_notional: s.min_notional,
            })
            .collect();

        Ok(symbols)
    }

    /// Fetch a candle series, enforcing the interval's minimum history.
    ///
    /// A series shorter than the minimum is rejected so callers never compute
    /// signals on truncated history; the symbol is skipped for the cycle.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<CandleSeries> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.to_string()),
        ];

        let rows: Vec<KlineRow> = self
            .client
            .execute(Method::GET, "/api/v1/klines", &params, None)
            .await?;

        if rows.len() < interval.min_candles() {
            return Err(BotError::Validation(format!(
                "insufficient history for {} {}: {} candles, need {}",
                symbol,
                interval,
                rows.len(),
                interval.min_candles()
            )));
        }

        let mut candles = Vec::with_capacity(rows.len());
        for (open_ms, open, high, low, close, volume) in rows {
            let open_time = Utc
                .timestamp_millis_opt(open_ms)
                .single()
                .ok_or_else(|| {
                    BotError::Validation(format!("invalid candle timestamp {}", open_ms))
                })?;
            candles.push(Candle {
                open_time,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        CandleSeries::new(symbol.to_string(), interval, candles)
    }

    /// Best bid and ask for a symbol
    pub async fn fetch_top_of_book(&self, symbol: &str) -> Result<(Decimal, Decimal)> {
        let params = [("symbol", symbol.to_string())];
        let book: BookTickerRaw = self
            .client
            .execute(Method::GET, "/api/v1/ticker/book", &params, None)
            .await?;

        Ok((book.bid_price, book.ask_price))
    }

    /// Free balance for an asset.
    ///
    /// Returns zero on any failure so a balance-check error never crashes
    /// the polling cycle.
    pub async fn fetch_free_balance(&self, asset: &str) -> Decimal {
        let params = [("asset", asset.to_string())];
        let result: Result<BalanceRaw> = self
            .client
            .execute(Method::GET, "/api/v1/account/balance", &params, None)
            .await;

        match result {
            Ok(balance) => balance.free,
            Err(e) => {
                tracing::warn!("balance lookup for {} failed, treating as zero: {}", asset, e);
                Decimal::ZERO
            }
        }
    }
}
