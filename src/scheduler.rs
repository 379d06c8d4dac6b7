use std::time::Duration;

use crate::api::MarketData;
use crate::error::Result;
use crate::execution::OrderExecutor;
use crate::models::{Interval, Signal, SymbolInfo};
use crate::strategy::SignalPolicy;

/// Daily candles requested for the retracement window
const DAILY_FETCH_LIMIT: u32 = 50;

/// Drives the polling cycle: one sequential pass over the symbol universe,
/// then a long sleep, forever.
///
/// Symbols are processed strictly one at a time, so there is exactly one
/// in-flight order and no cross-symbol race on the position store. Any
/// failure inside one symbol's processing is logged and the pass moves on;
/// a single symbol can never abort the cycle.
pub struct Scheduler {
    market: MarketData,
    executor: OrderExecutor,
    policy: Box<dyn SignalPolicy>,
    universe: Vec<SymbolInfo>,
    interval: Interval,
    fetch_limit: u32,
    symbol_delay: Duration,
    cycle_delay: Duration,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: MarketData,
        executor: OrderExecutor,
        policy: Box<dyn SignalPolicy>,
        universe: Vec<SymbolInfo>,
        interval: Interval,
        fetch_limit: u32,
        symbol_delay: Duration,
        cycle_delay: Duration,
    ) -> Self {
        Self {
            market,
            executor,
            policy,
            universe,
            interval,
            fetch_limit,
            symbol_delay,
            cycle_delay,
        }
    }

    pub fn executor(&self) -> &OrderExecutor {
        &self.executor
    }

    /// Run until the process is stopped
    pub async fn run(mut self) {
        tracing::info!(
            "🔄 Scheduler starting: {} symbols, {} interval, {} policy",
            self.universe.len(),
            self.interval,
            self.policy.name()
        );

        loop {
            self.run_cycle().await;

            tracing::info!(
                "Cycle complete, sleeping {}s ({} open positions)",
                self.cycle_delay.as_secs(),
                self.executor.positions().open_count()
            );
            tokio::time::sleep(self.cycle_delay).await;
        }
    }

    /// One pass over every symbol in the universe
    pub async fn run_cycle(&mut self) {
        let symbols = self.universe.clone();

        for symbol in &symbols {
            if let Err(e) = self.process_symbol(symbol).await {
                tracing::warn!("  ✗ {} skipped: {}", symbol.symbol, e);
            }

            // Courtesy spacing between exchange calls
            tokio::time::sleep(self.symbol_delay).await;
        }

        self.log_positions();
    }

    async fn process_symbol(&mut self, symbol: &SymbolInfo) -> Result<()> {
        let series = self
            .market
            .fetch_candles(&symbol.symbol, self.interval, self.fetch_limit)
            .await?;

        let daily = if self.policy.needs_daily_history() {
            Some(
                self.market
                    .fetch_candles(&symbol.symbol, Interval::OneDay, DAILY_FETCH_LIMIT)
                    .await?,
            )
        } else {
            None
        };

        let position_open = self.executor.positions().is_open(&symbol.symbol);
        let evaluation = self
            .policy
            .evaluate(&series, daily.as_ref(), position_open)?;

        match evaluation.signal {
            Signal::Buy => {
                tracing::info!(
                    "  📈 {} BUY signal ({:?})",
                    symbol.symbol,
                    evaluation.trigger
                );
                self.executor.open_position(symbol).await?;
            }
            Signal::Sell => {
                tracing::info!(
                    "  📉 {} SELL signal ({:?})",
                    symbol.symbol,
                    evaluation.trigger
                );
                self.executor
                    .close_position(symbol, self.policy.rebuy_before_exit())
                    .await?;
            }
            Signal::Hold => {
                tracing::debug!("  {} holds", symbol.symbol);
            }
        }

        Ok(())
    }

    fn log_positions(&self) {
        let positions = self.executor.positions();
        if positions.open_count() == 0 {
            return;
        }

        tracing::info!("📊 Open positions:");
        for symbol in positions.open_symbols() {
            if let Some(position) = positions.get(symbol) {
                tracing::info!(
                    "    {} | order {} | qty {} | since {}",
                    symbol,
                    position.order_id,
                    position.quantity,
                    position.opened_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
}
