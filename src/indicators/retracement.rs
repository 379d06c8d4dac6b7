use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::Candle;

/// Daily candles inspected when anchoring the swing
pub const SWING_WINDOW: usize = 50;
/// Fewer daily candles than this and no levels are produced
pub const MIN_DAILY_CANDLES: usize = 40;

/// Ratios of the seven standard levels, in scan order
pub const RATIOS: [(&str, Decimal); 7] = [
    ("0.0", dec!(0.0)),
    ("0.236", dec!(0.236)),
    ("0.382", dec!(0.382)),
    ("0.5", dec!(0.5)),
    ("0.618", dec!(0.618)),
    ("0.786", dec!(0.786)),
    ("1.0", dec!(1.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Low printed before high
    Upward,
    /// High printed before low
    Downward,
}

/// Seven retracement price levels over a recent daily swing.
///
/// Levels are ordered by ratio 0.0 -> 1.0. For an upward move they run from
/// the swing high down to the swing low; for a downward move from the swing
/// low up to the swing high.
#[derive(Debug, Clone)]
pub struct RetracementLevels {
    pub direction: TrendDirection,
    levels: [(&'static str, Decimal); 7],
}

impl RetracementLevels {
    /// Compute levels from the trailing daily window.
    ///
    /// Returns `None` below [`MIN_DAILY_CANDLES`]; callers treat that as a
    /// silent skip, not an error.
    pub fn from_daily(candles: &[Candle]) -> Option<Self> {
        if candles.len() < MIN_DAILY_CANDLES {
            return None;
        }

        let window_start = candles.len().saturating_sub(SWING_WINDOW);
        let window = &candles[window_start..];

        let lowest = window
            .iter()
            .min_by(|a, b| a.close.cmp(&b.close))?;
        let highest = window
            .iter()
            .max_by(|a, b| a.close.cmp(&b.close))?;

        let direction = if lowest.open_time <= highest.open_time {
            TrendDirection::Upward
        } else {
            TrendDirection::Downward
        };

        let (low, high) = (lowest.close, highest.close);
        let range = high - low;

        let mut levels = [("", Decimal::ZERO); 7];
        for (slot, (label, ratio)) in levels.iter_mut().zip(RATIOS.iter()) {
            let price = match direction {
                TrendDirection::Upward => high - range * ratio,
                TrendDirection::Downward => low + range * ratio,
            };
            *slot = (*label, price.round_dp(8));
        }

        Some(Self { direction, levels })
    }

    /// Levels in scan order (ratio 0.0 first)
    pub fn levels(&self) -> &[(&'static str, Decimal); 7] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn daily_closes(closes: &[Decimal]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1),
            })
            .collect()
    }

    #[test]
    fn test_requires_forty_daily_candles() {
        let candles = daily_closes(&vec![dec!(100); 39]);
        assert!(RetracementLevels::from_daily(&candles).is_none());

        let candles = daily_closes(&vec![dec!(100); 40]);
        assert!(RetracementLevels::from_daily(&candles).is_some());
    }

    #[test]
    fn test_upward_move_levels_descend() {
        // Low early, high late -> upward move
        let mut closes = vec![dec!(100); 48];
        closes[5] = dec!(80);
        closes[45] = dec!(120);
        let levels = RetracementLevels::from_daily(&daily_closes(&closes)).unwrap();

        assert_eq!(levels.direction, TrendDirection::Upward);
        assert_eq!(levels.levels().len(), 7);
        assert_eq!(levels.levels()[0], ("0.0", dec!(120)));
        assert_eq!(levels.levels()[6], ("1.0", dec!(80)));
        assert!(levels.levels().windows(2).all(|w| w[1].1 <= w[0].1));
    }

    #[test]
    fn test_downward_move_levels_ascend() {
        // High early, low late -> downward move
        let mut closes = vec![dec!(100); 48];
        closes[5] = dec!(120);
        closes[45] = dec!(80);
        let levels = RetracementLevels::from_daily(&daily_closes(&closes)).unwrap();

        assert_eq!(levels.direction, TrendDirection::Downward);
        assert_eq!(levels.levels()[0], ("0.0", dec!(80)));
        assert_eq!(levels.levels()[6], ("1.0", dec!(120)));
        assert!(levels.levels().windows(2).all(|w| w[1].1 >= w[0].1));
    }

    #[test]
    fn test_interpolated_levels() {
        let mut closes = vec![dec!(100); 50];
        closes[0] = dec!(0);
        closes[49] = dec!(1000);
        let levels = RetracementLevels::from_daily(&daily_closes(&closes)).unwrap();

        // Range 0 -> 1000 upward: level 0.382 sits at 1000 - 382
        let half = levels.levels()[3];
        assert_eq!(half, ("0.5", dec!(500)));
        let fib = levels.levels()[2];
        assert_eq!(fib, ("0.382", dec!(618)));
    }

    #[test]
    fn test_uses_trailing_window_only() {
        // An extreme older than the 50-day window must be ignored
        let mut closes = vec![dec!(100); 60];
        closes[2] = dec!(1);
        closes[55] = dec!(110);
        let levels = RetracementLevels::from_daily(&daily_closes(&closes)).unwrap();

        assert_eq!(levels.levels()[0], ("0.0", dec!(110)));
        assert_eq!(levels.levels()[6], ("1.0", dec!(100)));
    }

    #[test]
    fn test_recomputation_is_deterministic() {
        let closes: Vec<Decimal> = (0..50).map(|i| Decimal::from(90 + (i * 11) % 30)).collect();
        let candles = daily_closes(&closes);

        let a = RetracementLevels::from_daily(&candles).unwrap();
        let b = RetracementLevels::from_daily(&candles).unwrap();
        assert_eq!(a.levels(), b.levels());
        assert_eq!(a.direction, b.direction);
    }
}
