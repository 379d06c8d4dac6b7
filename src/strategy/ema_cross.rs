use super::{price_ratio, CrossDirection, Evaluation, SignalPolicy, Trigger, MAX_ENTRY_PRICE_RATIO};
use crate::error::BotError;
use crate::indicators::ema_series;
use crate::models::{CandleSeries, Signal};
use crate::Result;

/// Dual/triple EMA crossover policy.
///
/// A BUY fires when the fast EMA crosses above the slow EMA on the latest
/// closed candle; a SELL fires when the exit EMA crosses below the fast EMA.
/// The two branches are mutually exclusive within a cycle.
#[derive(Debug, Clone)]
pub struct EmaCrossPolicy {
    fast_window: usize,
    slow_window: usize,
    exit_window: usize,
}

impl EmaCrossPolicy {
    pub fn new(fast_window: usize, slow_window: usize, exit_window: usize) -> Self {
        Self {
            fast_window,
            slow_window,
            exit_window,
        }
    }
}

impl Default for EmaCrossPolicy {
    fn default() -> Self {
        Self::new(9, 200, 5)
    }
}

impl SignalPolicy for EmaCrossPolicy {
    fn name(&self) -> &str {
        "EmaCrossPolicy"
    }

    fn min_candles(&self) -> usize {
        // Longest window plus a small buffer
        self.slow_window + 5
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        _daily: Option<&CandleSeries>,
        position_open: bool,
    ) -> Result<Evaluation> {
        if series.len() < self.min_candles() {
            return Err(BotError::Validation(format!(
                "insufficient data: {} candles, need {}",
                series.len(),
                self.min_candles()
            )));
        }

        let closes = series.closes();
        let fast = ema_series(&closes, self.fast_window);
        let slow = ema_series(&closes, self.slow_window);
        let exit = ema_series(&closes, self.exit_window);

        let cur = closes.len() - 2;
        let prev = closes.len() - 3;

        let current_candle = series.last_closed().ok_or_else(|| {
            BotError::Validation("series too short for a closed candle".to_string())
        })?;
        let ratio = price_ratio(current_candle);

        let calm_entry = matches!(ratio, Some(r) if r < MAX_ENTRY_PRICE_RATIO);

        if !position_open && calm_entry && fast[prev] <= slow[prev] && fast[cur] > slow[cur] {
            Ok(Evaluation {
                signal: Signal::Buy,
                trigger: Some(Trigger::EmaCross {
                    fast_window: self.fast_window,
                    slow_window: self.slow_window,
                    direction: CrossDirection::Above,
                }),
            })
        } else if position_open && exit[prev] >= fast[prev] && exit[cur] < fast[cur] {
            Ok(Evaluation {
                signal: Signal::Sell,
                trigger: Some(Trigger::EmaCross {
                    fast_window: self.exit_window,
                    slow_window: self.fast_window,
                    direction: CrossDirection::Below,
                }),
            })
        } else {
            Ok(Evaluation::hold())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, Interval};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn series_from(closes: Vec<(Decimal, Decimal)>) -> CandleSeries {
        // (open, close) pairs, 15 minutes apart
        let candles: Vec<Candle> = closes
            .into_iter()
            .enumerate()
            .map(|(i, (open, close))| Candle {
                open_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(i as i64 * 15),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: dec!(1000),
            })
            .collect();
        CandleSeries::new("BTCUSDT".to_string(), Interval::FifteenMinutes, candles).unwrap()
    }

    fn flat_then_bump(bump_open: Decimal, bump_close: Decimal) -> CandleSeries {
        // 248 flat candles, then the bump candle (latest closed), then the
        // still-forming candle
        let mut rows = vec![(dec!(100), dec!(100)); 248];
        rows.push((bump_open, bump_close));
        rows.push((bump_close, bump_close));
        series_from(rows)
    }

    #[test]
    fn test_buy_on_fast_cross_above_slow() {
        let series = flat_then_bump(dec!(100.5), dec!(101));
        let policy = EmaCrossPolicy::default();

        let eval = policy.evaluate(&series, None, false).unwrap();

        assert_eq!(eval.signal, Signal::Buy);
        assert_eq!(
            eval.trigger,
            Some(Trigger::EmaCross {
                fast_window: 9,
                slow_window: 200,
                direction: CrossDirection::Above,
            })
        );
    }

    #[test]
    fn test_buy_blocked_by_price_ratio() {
        // Same crossover but the candle moved 4% open-to-close
        let series = flat_then_bump(dec!(100), dec!(104));
        let policy = EmaCrossPolicy::default();

        let eval = policy.evaluate(&series, None, false).unwrap();
        assert_eq!(eval.signal, Signal::Hold);
    }

    #[test]
    fn test_buy_blocked_by_zero_open() {
        let series = flat_then_bump(dec!(0), dec!(101));
        let policy = EmaCrossPolicy::default();

        let eval = policy.evaluate(&series, None, false).unwrap();
        assert_eq!(eval.signal, Signal::Hold);
    }

    #[test]
    fn test_no_buy_while_position_open() {
        let series = flat_then_bump(dec!(100.5), dec!(101));
        let policy = EmaCrossPolicy::default();

        let eval = policy.evaluate(&series, None, true).unwrap();
        // The sell branch does not fire either: exit EMA is above fast here
        assert_eq!(eval.signal, Signal::Hold);
    }

    #[test]
    fn test_sell_on_exit_cross_below_fast() {
        // Steady uptrend keeps exit EMA above fast EMA, then a sharp drop on
        // the latest closed candle pulls the exit EMA underneath
        let mut rows: Vec<(Decimal, Decimal)> = (0..248)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i) / dec!(10);
                (close, close)
            })
            .collect();
        rows.push((dec!(124.7), dec!(100)));
        rows.push((dec!(100), dec!(100)));
        let series = series_from(rows);

        let policy = EmaCrossPolicy::default();
        let eval = policy.evaluate(&series, None, true).unwrap();

        assert_eq!(eval.signal, Signal::Sell);
        assert_eq!(
            eval.trigger,
            Some(Trigger::EmaCross {
                fast_window: 5,
                slow_window: 9,
                direction: CrossDirection::Below,
            })
        );
    }

    #[test]
    fn test_sell_requires_open_position() {
        let mut rows: Vec<(Decimal, Decimal)> = (0..248)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i) / dec!(10);
                (close, close)
            })
            .collect();
        rows.push((dec!(124.7), dec!(100)));
        rows.push((dec!(100), dec!(100)));
        let series = series_from(rows);

        let policy = EmaCrossPolicy::default();
        let eval = policy.evaluate(&series, None, false).unwrap();
        assert_eq!(eval.signal, Signal::Hold);
    }

    #[test]
    fn test_quiet_market_holds() {
        let rows = vec![(dec!(100), dec!(100)); 250];
        let series = series_from(rows);

        let policy = EmaCrossPolicy::default();
        assert_eq!(
            policy.evaluate(&series, None, false).unwrap().signal,
            Signal::Hold
        );
        assert_eq!(
            policy.evaluate(&series, None, true).unwrap().signal,
            Signal::Hold
        );
    }

    #[test]
    fn test_insufficient_data_is_an_error() {
        let rows = vec![(dec!(100), dec!(100)); 50];
        let series = series_from(rows);

        let policy = EmaCrossPolicy::default();
        let result = policy.evaluate(&series, None, false);
        assert!(result.is_err());
    }
}
