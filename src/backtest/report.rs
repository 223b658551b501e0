use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::backtest::engine::BacktestRun;
use crate::backtest::metrics::BacktestSummary;
use crate::models::TradeStatus;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Print the run summary to stdout.
pub fn print_summary(summary: &BacktestSummary) {
    println!("\n{}", "=".repeat(70));
    println!("  OPTIONS BACKTEST REPORT");
    println!("{}", "=".repeat(70));
    println!();
    println!("  TRADES");
    println!("  ───────────────────────────────────");
    println!("  Total:       {}", summary.total_trades);
    println!("  Recorded:    {}", summary.recorded_trades);
    println!("  Failed:      {}", summary.failed_trades);
    println!(
        "  Win/Loss:    {} / {}",
        summary.winning_trades, summary.losing_trades
    );
    println!("  Win Rate:    {:.1}%", summary.win_rate);
    println!();
    println!("  P&L");
    println!("  ───────────────────────────────────");
    println!("  Options:     {:+.2}", summary.total_pnl);
    println!("  Spot:        {:+.2}", summary.total_spot_pnl);
    println!("  Avg Trade:   {:+.2}", summary.avg_pnl);
    println!("  Avg Win:     {:+.2}", summary.avg_win);
    println!("  Avg Loss:    {:+.2}", summary.avg_loss);
    println!("  Best:        {:+.2}", summary.max_profit);
    println!("  Worst:       {:+.2}", summary.max_loss);
    println!("  Profit Factor: {}", summary.profit_factor);
    println!("  Max Drawdown:  {:.2}", summary.max_drawdown);

    if !summary.monthly.is_empty() {
        println!();
        println!("  BY MONTH");
        println!("  ───────────────────────────────────");
        for m in &summary.monthly {
            println!(
                "  {} {}: {} trades | PnL {:+.2}",
                MONTH_NAMES[(m.month - 1) as usize],
                m.year,
                m.trades,
                m.total_pnl
            );
        }
    }

    println!("{}", "=".repeat(70));
}

/// Write the per-trade results and summary to a plain-text report file.
pub fn save_report(run: &BacktestRun, summary: &BacktestSummary, path: &Path) -> Result<()> {
    let mut f = std::fs::File::create(path)?;

    writeln!(f, "NIFTY Options Backtest Report")?;
    writeln!(f, "=============================")?;
    writeln!(f)?;
    writeln!(f, "Trades:")?;
    writeln!(f, "  Total:     {}", summary.total_trades)?;
    writeln!(f, "  Recorded:  {}", summary.recorded_trades)?;
    writeln!(f, "  Failed:    {}", summary.failed_trades)?;
    writeln!(
        f,
        "  Win/Loss:  {} / {}",
        summary.winning_trades, summary.losing_trades
    )?;
    writeln!(f, "  Win Rate:  {:.1}%", summary.win_rate)?;
    writeln!(f)?;
    writeln!(f, "P&L:")?;
    writeln!(f, "  Options:       {:+.2}", summary.total_pnl)?;
    writeln!(f, "  Spot:          {:+.2}", summary.total_spot_pnl)?;
    writeln!(f, "  Avg Trade:     {:+.2}", summary.avg_pnl)?;
    writeln!(f, "  Profit Factor: {}", summary.profit_factor)?;
    writeln!(f, "  Max Drawdown:  {:.2}", summary.max_drawdown)?;
    writeln!(f)?;

    if !summary.monthly.is_empty() {
        writeln!(f, "By Month:")?;
        for m in &summary.monthly {
            writeln!(
                f,
                "  {}-{:02}: {} trades | PnL {:+.2}",
                m.year, m.month, m.trades, m.total_pnl
            )?;
        }
        writeln!(f)?;
    }

    writeln!(f, "Per Trade:")?;
    for r in &run.records {
        match &r.status {
            TradeStatus::Recorded => writeln!(
                f,
                "  #{:<4} {} exp {} strike {:<7} entry {:.2} exit {:.2} pnl {:+.2}",
                r.trade_id,
                r.option_side,
                r.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
                r.strike.unwrap_or_default(),
                r.entry_option_price.unwrap_or_default(),
                r.exit_option_price.unwrap_or_default(),
                r.pnl_total.unwrap_or_default(),
            )?,
            TradeStatus::Failed { reason } => {
                writeln!(f, "  #{:<4} {} FAILED: {}", r.trade_id, r.option_side, reason)?
            }
        }
    }

    Ok(())
}
