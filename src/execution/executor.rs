use chrono::Utc;
use reqwest::Method;
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::Duration;

use crate::api::{MarketData, SignedClient};
use crate::error::{BotError, Result};
use crate::execution::position::{OpenPosition, PositionStore};
use crate::models::{OrderRequest, OrderResult, SymbolInfo};
use crate::notify::AlertSender;

/// Total submissions allowed for one sell, first try included
pub const SELL_MAX_ATTEMPTS: u32 = 5;
const SELL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Places market orders and owns the per-symbol position store.
///
/// Buys are submitted exactly once: a duplicate market buy is not idempotent
/// against the exchange, so a failed buy ends the symbol's cycle with the
/// store unchanged. Sells retry up to [`SELL_MAX_ATTEMPTS`] times and
/// escalate to the alert sink only after the last attempt fails.
pub struct OrderExecutor {
    client: SignedClient,
    market: MarketData,
    positions: PositionStore,
    alerts: AlertSender,
    /// Quote value of each entry buy
    trade_notional: Decimal,
    /// Quote value of the partial sell placed right after an entry
    skim_notional: Decimal,
    sell_retry_delay: Duration,
}

impl OrderExecutor {
    pub fn new(
        client: SignedClient,
        market: MarketData,
        alerts: AlertSender,
        trade_notional: Decimal,
        skim_notional: Decimal,
    ) -> Self {
        Self {
            client,
            market,
            positions: PositionStore::new(),
            alerts,
            trade_notional,
            skim_notional,
            sell_retry_delay: SELL_RETRY_DELAY,
        }
    }

    /// Override the pause between sell attempts
    pub fn with_sell_retry_delay(mut self, delay: Duration) -> Self {
        self.sell_retry_delay = delay;
        self
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    #[cfg(test)]
    pub fn positions_mut(&mut self) -> &mut PositionStore {
        &mut self.positions
    }

    /// Entry buy followed by the skim partial exit.
    ///
    /// The buy notional is raised to the symbol's minimum notional when the
    /// configured size is below it. On success the store records the order
    /// id and a filled-quantity estimate of `notional / best ask`.
    pub async fn open_position(&mut self, symbol: &SymbolInfo) -> Result<()> {
        if self.positions.is_open(&symbol.symbol) {
            return Err(BotError::Validation(format!(
                "position for {} is already open",
                symbol.symbol
            )));
        }

        let notional = self.trade_notional.max(symbol.min_notional);
        let (_bid, ask) = self.market.fetch_top_of_book(&symbol.symbol).await?;

        // Exactly one attempt; failure leaves the store untouched
        let order = OrderRequest::market_buy(&symbol.symbol, notional);
        let result = self.submit(&order).await?;

        let entry_quantity = if ask.is_zero() {
            Decimal::ZERO
        } else {
            floor_to_precision(notional / ask, symbol.base_precision)
        };

        self.positions.open(
            &symbol.symbol,
            OpenPosition {
                order_id: result.order_id,
                quantity: entry_quantity,
                opened_at: Utc::now(),
            },
        );

        tracing::info!(
            "✓ Bought {} for {} (order {}, est. qty {})",
            symbol.symbol,
            notional,
            result.order_id,
            entry_quantity
        );

        // Skim: recover most of the entry cost; position state is untouched
        // and a failure here never unwinds the entry
        if let Err(e) = self.sell_with_notional(symbol, self.skim_notional).await {
            tracing::warn!("✗ Skim sell for {} failed: {}", symbol.symbol, e);
        }

        Ok(())
    }

    /// Full-balance exit, optionally preceded by a token re-buy.
    ///
    /// The re-buy is best-effort: its failure is logged and the exit
    /// proceeds. The store is cleared only after the sell succeeds.
    pub async fn close_position(&mut self, symbol: &SymbolInfo, rebuy_first: bool) -> Result<()> {
        if !self.positions.is_open(&symbol.symbol) {
            return Err(BotError::Validation(format!(
                "no tracked position for {}",
                symbol.symbol
            )));
        }

        if rebuy_first {
            let order = OrderRequest::market_buy(&symbol.symbol, symbol.min_notional);
            match self.submit(&order).await {
                Ok(result) => {
                    tracing::debug!(
                        "Token re-buy for {} placed (order {})",
                        symbol.symbol,
                        result.order_id
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "✗ Token re-buy for {} failed, proceeding with exit: {}",
                        symbol.symbol,
                        e
                    );
                }
            }
        }

        self.sell_full_balance(symbol).await?;
        self.positions.clear(&symbol.symbol);
        tracing::info!("✓ Closed position for {}", symbol.symbol);
        Ok(())
    }

    /// Partial sell sized in quote currency: quantity = notional / best bid
    async fn sell_with_notional(&mut self, symbol: &SymbolInfo, notional: Decimal) -> Result<()> {
        let (bid, _ask) = self.market.fetch_top_of_book(&symbol.symbol).await?;
        if bid.is_zero() {
            return Err(BotError::Validation(format!(
                "no bid for {}, cannot size sell",
                symbol.symbol
            )));
        }

        let quantity = floor_to_precision(notional / bid, symbol.base_precision);
        if quantity.is_zero() {
            return Err(BotError::Validation(format!(
                "sell quantity for {} rounds to zero",
                symbol.symbol
            )));
        }

        self.retry_sell(symbol, quantity, false).await.map(|_| ())
    }

    /// Sell the whole free balance; fails locally when nothing is free
    async fn sell_full_balance(&mut self, symbol: &SymbolInfo) -> Result<()> {
        let balance = self.market.fetch_free_balance(&symbol.base_asset).await;
        if balance <= Decimal::ZERO {
            return Err(BotError::Validation(format!(
                "no free {} balance to sell",
                symbol.base_asset
            )));
        }

        let quantity = floor_to_precision(balance, symbol.base_precision);
        self.retry_sell(symbol, quantity, true).await.map(|_| ())
    }

    /// Bounded sell retry. When `refresh_balance` is set the quantity is
    /// re-derived from the free balance before each resubmission. Exhausting
    /// the attempts emits exactly one alert.
    async fn retry_sell(
        &mut self,
        symbol: &SymbolInfo,
        mut quantity: Decimal,
        refresh_balance: bool,
    ) -> Result<OrderResult> {
        let mut last_err = None;

        for attempt in 1..=SELL_MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(self.sell_retry_delay).await;

                if refresh_balance {
                    let refreshed = self.market.fetch_free_balance(&symbol.base_asset).await;
                    if refreshed > Decimal::ZERO {
                        quantity = floor_to_precision(refreshed, symbol.base_precision);
                    }
                }
            }

            let order = OrderRequest::market_sell(&symbol.symbol, quantity);
            match self.submit(&order).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "✗ Sell attempt {}/{} for {} failed: {}",
                        attempt,
                        SELL_MAX_ATTEMPTS,
                        symbol.symbol,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        let err = last_err.unwrap_or_else(|| {
            BotError::Validation(format!("sell for {} made no attempts", symbol.symbol))
        });
        self.alerts.send(&symbol.symbol, &err.to_string());
        Err(err)
    }

    /// One signed order submission; an unsuccessful acknowledgement counts
    /// as a rejection
    async fn submit(&self, order: &OrderRequest) -> Result<OrderResult> {
        let body = serde_json::to_value(order)
            .map_err(|e| BotError::Validation(format!("unserializable order: {}", e)))?;

        let result: OrderResult = self
            .client
            .execute(Method::POST, "/api/v1/order", &[], Some(&body))
            .await?;

        if !result.success {
            return Err(BotError::Rejection {
                status: 200,
                message: format!("order {} not accepted", result.order_id),
            });
        }

        Ok(result)
    }
}

fn floor_to_precision(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}
