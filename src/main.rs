use clap::Parser;
use std::str::FromStr;
use std::time::Duration;

use spotbot::api::{MarketData, SignedClient};
use spotbot::config::{Settings, StrategyKind};
use spotbot::execution::OrderExecutor;
use spotbot::models::Interval;
use spotbot::notify::{self, AlertSender};
use spotbot::scheduler::Scheduler;
use spotbot::strategy::{EmaCrossPolicy, LevelCrossPolicy, SignalPolicy};

/// Spot-trading agent: polls candles, detects crossovers, places market orders
#[derive(Debug, Parser)]
#[command(name = "spotbot")]
struct Args {
    /// Signal policy: level-cross or ema-cross
    #[arg(long, value_parser = StrategyKind::from_str)]
    strategy: Option<StrategyKind>,

    /// Trading interval, e.g. 15m
    #[arg(long, value_parser = Interval::from_str)]
    interval: Option<Interval>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let mut settings = Settings::load()?;
    if let Some(strategy) = args.strategy {
        settings.strategy = strategy;
    }
    if let Some(interval) = args.interval {
        settings.interval = interval;
    }

    tracing::info!("🚀 Spotbot starting");
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Strategy: {}", settings.strategy);
    tracing::info!("  Interval: {}", settings.interval);
    tracing::info!("  Quote asset: {}", settings.quote_asset);
    tracing::info!("  Trade notional: {}", settings.trade_notional);
    tracing::info!("  Skim notional: {}", settings.skim_notional);

    let client = SignedClient::new(
        settings.base_url.clone(),
        settings.api_key.clone(),
        settings.api_secret.clone(),
    )?;
    let market = MarketData::new(client.clone());

    // Universe is resolved once; new listings wait for a restart
    let universe = market.fetch_symbols(&settings.quote_asset).await?;
    if universe.is_empty() {
        anyhow::bail!("no tradable {} pairs found", settings.quote_asset);
    }
    tracing::info!("✅ Universe: {} tradable pairs", universe.len());
    for symbol in &universe {
        tracing::info!("    - {}", symbol.symbol);
    }

    let alerts = build_alert_sender(&settings);
    let executor = OrderExecutor::new(
        client,
        market.clone(),
        alerts,
        settings.trade_notional,
        settings.skim_notional,
    );
    let policy = build_policy(settings.strategy);

    let scheduler = Scheduler::new(
        market,
        executor,
        policy,
        universe,
        settings.interval,
        settings.fetch_limit,
        Duration::from_secs(settings.symbol_delay_secs),
        Duration::from_secs(settings.cycle_delay_secs),
    );

    let trading_task = tokio::spawn(scheduler.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
        }
        result = trading_task => {
            tracing::error!("Trading loop exited: {:?}", result);
        }
    }

    tracing::info!("👋 Spotbot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotbot=info,spotbot::strategy=debug".into()),
        )
        .init();
}

fn build_alert_sender(settings: &Settings) -> AlertSender {
    match &settings.alert_webhook_url {
        Some(url) => {
            tracing::info!("  Alerts: webhook enabled");
            notify::spawn_worker(url.clone())
        }
        None => {
            tracing::info!("  Alerts: disabled (no webhook configured)");
            AlertSender::disabled()
        }
    }
}

fn build_policy(kind: StrategyKind) -> Box<dyn SignalPolicy> {
    match kind {
        StrategyKind::LevelCross => Box::new(LevelCrossPolicy::default()),
        StrategyKind::EmaCross => Box::new(EmaCrossPolicy::default()),
    }
}
