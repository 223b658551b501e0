use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use nifty_options_backtest::backtest::{report, BacktestEngine};
use nifty_options_backtest::config::Config;
use nifty_options_backtest::gateway::{MarketDataGateway, SyntheticGateway, UpstoxGateway};
use nifty_options_backtest::models::TradeSignal;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let trades_path = args
        .get(1)
        .map(PathBuf::from)
        .context("usage: backtest <trades.json> [report.txt] [--synthetic]")?;
    let report_path = args
        .get(2)
        .filter(|s| !s.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("backtest_report.txt"));
    let synthetic = args.iter().any(|a| a == "--synthetic");

    let raw = std::fs::read_to_string(&trades_path)
        .with_context(|| format!("reading {}", trades_path.display()))?;
    let signals: Vec<TradeSignal> =
        serde_json::from_str(&raw).context("parsing trade signals")?;

    println!("Loaded {} trade signals from {}", signals.len(), trades_path.display());
    println!(
        "Config: {} expiry, {} rollover, {} lot {} interval {}",
        cfg.expiry_weekday, cfg.rollover_weekday, cfg.moneyness, cfg.lot_size, cfg.interval
    );

    // The synthetic gateway is an explicit caller choice, never a fallback.
    let gateway: Arc<dyn MarketDataGateway> = if synthetic {
        println!("Gateway: synthetic quotes");
        Arc::new(SyntheticGateway::new())
    } else {
        cfg.validate_live()?;
        println!("Gateway: Upstox live data");
        Arc::new(UpstoxGateway::new(&cfg))
    };

    let engine = BacktestEngine::new(gateway, cfg);
    let run = engine.run(signals).await?;
    let summary = run.summary();

    report::print_summary(&summary);
    report::save_report(&run, &summary, &report_path)?;
    println!("\nReport saved to: {}", report_path.display());

    Ok(())
}
