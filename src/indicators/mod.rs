// Technical indicators module
// Pure functions over candle data; no I/O, recomputed from scratch each cycle

pub mod ema;
pub mod retracement;

pub use ema::ema_series;
pub use retracement::{RetracementLevels, TrendDirection};
