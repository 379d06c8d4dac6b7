// Trading strategy module
pub mod ema_cross;
pub mod level_cross;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{Candle, CandleSeries, Signal};
use crate::Result;

pub use ema_cross::EmaCrossPolicy;
pub use level_cross::LevelCrossPolicy;

/// Buys are suppressed when the latest closed candle moved more than this
/// fraction between open and close
pub const MAX_ENTRY_PRICE_RATIO: Decimal = dec!(0.02);

/// Direction of a detected crossover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Above,
    Below,
}

/// What fired the signal, kept for logging and audit
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    LevelCross {
        ratio: &'static str,
        level: Decimal,
        direction: CrossDirection,
    },
    EmaCross {
        fast_window: usize,
        slow_window: usize,
        direction: CrossDirection,
    },
}

/// Outcome of one policy evaluation: at most one signal per symbol per cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    pub trigger: Option<Trigger>,
}

impl Evaluation {
    pub fn hold() -> Self {
        Self {
            signal: Signal::Hold,
            trigger: None,
        }
    }
}

/// Pluggable signal-evaluation policy.
///
/// Evaluated once per symbol per cycle against the two most recent closed
/// candles; the forming candle is never consulted.
pub trait SignalPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum candles the trading-interval series must carry
    fn min_candles(&self) -> usize;

    /// Whether the policy consumes a daily series in addition to the
    /// trading-interval series
    fn needs_daily_history(&self) -> bool {
        false
    }

    /// Whether a full exit is preceded by a token re-buy
    fn rebuy_before_exit(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        daily: Option<&CandleSeries>,
        position_open: bool,
    ) -> Result<Evaluation>;
}

/// Relative open-to-close move of a candle.
///
/// `None` when the open is zero; callers must skip the buy branch in that
/// case rather than treat the ratio as small.
pub fn price_ratio(candle: &Candle) -> Option<Decimal> {
    if candle.open.is_zero() {
        return None;
    }
    Some((candle.open - candle.close).abs() / candle.open)
}
