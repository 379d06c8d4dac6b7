use super::{price_ratio, CrossDirection, Evaluation, SignalPolicy, Trigger, MAX_ENTRY_PRICE_RATIO};
use crate::error::BotError;
use crate::indicators::{ema_series, RetracementLevels};
use crate::models::{CandleSeries, Signal};
use crate::Result;

/// EMA-versus-retracement-level crossover policy.
///
/// Levels come from the trailing daily swing; the short EMA runs on the
/// trading interval. The first crossed level in ratio order wins the cycle,
/// and a buy suppresses the sell branch until the next cycle. Exits are
/// preceded by a token re-buy so the full-balance sell clears the position
/// including previously stranded dust.
#[derive(Debug, Clone)]
pub struct LevelCrossPolicy {
    ema_window: usize,
}

impl LevelCrossPolicy {
    pub fn new(ema_window: usize) -> Self {
        Self { ema_window }
    }
}

impl Default for LevelCrossPolicy {
    fn default() -> Self {
        Self::new(9)
    }
}

impl SignalPolicy for LevelCrossPolicy {
    fn name(&self) -> &str {
        "LevelCrossPolicy"
    }

    fn min_candles(&self) -> usize {
        self.ema_window + 5
    }

    fn needs_daily_history(&self) -> bool {
        true
    }

    fn rebuy_before_exit(&self) -> bool {
        true
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        daily: Option<&CandleSeries>,
        position_open: bool,
    ) -> Result<Evaluation> {
        if series.len() < self.min_candles() {
            return Err(BotError::Validation(format!(
                "insufficient data: {} candles, need {}",
                series.len(),
                self.min_candles()
            )));
        }

        // Too little daily history is a silent skip, not an error
        let levels = match daily.and_then(|d| RetracementLevels::from_daily(d.candles())) {
            Some(levels) => levels,
            None => return Ok(Evaluation::hold()),
        };

        let closes = series.closes();
        let ema = ema_series(&closes, self.ema_window);

        let cur = closes.len() - 2;
        let prev = closes.len() - 3;

        let current_candle = series.last_closed().ok_or_else(|| {
            BotError::Validation("series too short for a closed candle".to_string())
        })?;
        let ratio = price_ratio(current_candle);
        let calm_entry = matches!(ratio, Some(r) if r < MAX_ENTRY_PRICE_RATIO);

        if !position_open && calm_entry {
            for &(label, level) in levels.levels() {
                if ema[prev] <= level && ema[cur] > level {
                    return Ok(Evaluation {
                        signal: Signal::Buy,
                        trigger: Some(Trigger::LevelCross {
                            ratio: label,
                            level,
                            direction: CrossDirection::Above,
                        }),
                    });
                }
            }
        } else if position_open {
            for &(label, level) in levels.levels() {
                if ema[prev] >= level && ema[cur] < level {
                    return Ok(Evaluation {
                        signal: Signal::Sell,
                        trigger: Some(Trigger::LevelCross {
                            ratio: label,
                            level,
                            direction: CrossDirection::Below,
                        }),
                    });
                }
            }
        }

        Ok(Evaluation::hold())
    }
}
