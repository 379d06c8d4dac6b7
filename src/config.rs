use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::models::Interval;

/// Which signal policy drives trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// EMA vs retracement-level crossover
    LevelCross,
    /// Fast/slow EMA crossover
    EmaCross,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level-cross" => Ok(StrategyKind::LevelCross),
            "ema-cross" => Ok(StrategyKind::EmaCross),
            other => Err(format!(
                "unknown strategy '{}' (expected level-cross or ema-cross)",
                other
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::LevelCross => f.write_str("level-cross"),
            StrategyKind::EmaCross => f.write_str("ema-cross"),
        }
    }
}

/// Runtime settings, loaded from the environment (prefix `SPOTBOT_`)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    /// Stablecoin every tradable pair must be quoted in
    pub quote_asset: String,
    pub interval: Interval,
    pub strategy: StrategyKind,
    /// Quote-currency value of each entry buy
    pub trade_notional: Decimal,
    /// Quote-currency value of the partial sell placed after a buy
    pub skim_notional: Decimal,
    /// Candles requested per fetch
    pub fetch_limit: u32,
    /// Pause between symbols within a cycle, seconds
    pub symbol_delay_secs: u64,
    /// Pause between full cycles, seconds
    pub cycle_delay_secs: u64,
    /// Webhook receiving sell-failure alerts; alerts are disabled when unset
    pub alert_webhook_url: Option<String>,
}

impl Settings {
    /// Load settings from `SPOTBOT_*` environment variables.
    ///
    /// Credentials have no defaults and missing ones fail the load.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("base_url", "https://api.exchange.example")?
            .set_default("quote_asset", "USDT")?
            .set_default("interval", "15m")?
            .set_default("strategy", "ema-cross")?
            .set_default("trade_notional", "15")?
            .set_default("skim_notional", "10")?
            .set_default("fetch_limit", 300)?
            .set_default("symbol_delay_secs", 2)?
            .set_default("cycle_delay_secs", 60)?
            .add_source(config::Environment::with_prefix("SPOTBOT").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!(
            StrategyKind::from_str("level-cross").unwrap(),
            StrategyKind::LevelCross
        );
        assert_eq!(
            StrategyKind::from_str("ema-cross").unwrap(),
            StrategyKind::EmaCross
        );
        assert!(StrategyKind::from_str("martingale").is_err());
    }

    #[test]
    fn test_strategy_kind_display_round_trip() {
        for kind in [StrategyKind::LevelCross, StrategyKind::EmaCross] {
            assert_eq!(StrategyKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }
}
