use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::Datelike;

use crate::models::ResultRecord;

/// Profit factor: gross profit over gross loss. Kept as a tri-state so a
/// loss-free run reports infinity rather than tripping a division error, and
/// a run with no P&L at all reports N/A.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProfitFactor {
    Ratio(f64),
    Infinite,
    Undefined,
}

impl std::fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfitFactor::Ratio(v) => write!(f, "{:.2}", v),
            ProfitFactor::Infinite => write!(f, "inf"),
            ProfitFactor::Undefined => write!(f, "N/A"),
        }
    }
}

/// P&L totals for one calendar month of entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPnl {
    pub year: i32,
    pub month: u32,
    pub trades: usize,
    pub total_pnl: f64,
}

/// Aggregate statistics over a full result set. Failed trades are counted in
/// the totals but excluded from every P&L figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub recorded_trades: usize,
    pub failed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_spot_pnl: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub profit_factor: ProfitFactor,
    /// Running cumulative P&L in input order, one point per recorded trade.
    pub equity_curve: Vec<f64>,
    /// Largest drop from a running equity peak; non-positive.
    pub max_drawdown: f64,
    pub monthly: Vec<MonthlyPnl>,
}

/// Aggregate a full result collection. Equity and drawdown follow input
/// order, not time order: reordering the input changes the curve even when
/// the total P&L does not.
pub fn summarize(records: &[ResultRecord]) -> BacktestSummary {
    let recorded: Vec<&ResultRecord> = records.iter().filter(|r| r.status.is_recorded()).collect();
    let pnls: Vec<f64> = recorded.iter().filter_map(|r| r.pnl_total).collect();

    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let win_rate = if recorded.is_empty() {
        0.0
    } else {
        wins.len() as f64 / recorded.len() as f64 * 100.0
    };

    let total_pnl: f64 = pnls.iter().sum();
    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();

    let profit_factor = if gross_loss > 0.0 {
        ProfitFactor::Ratio(gross_profit / gross_loss)
    } else if gross_profit > 0.0 {
        ProfitFactor::Infinite
    } else {
        ProfitFactor::Undefined
    };

    // Peak is taken over realized equity points only, so a run that opens
    // with losses has no drawdown until a peak is actually set.
    let mut equity_curve = Vec::with_capacity(pnls.len());
    let mut equity = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0f64;
    for pnl in &pnls {
        equity += pnl;
        equity_curve.push(equity);
        peak = peak.max(equity);
        max_drawdown = max_drawdown.min(equity - peak);
    }

    // Group by entry month; BTreeMap keeps months chronological.
    let mut monthly_map: BTreeMap<(i32, u32), (usize, f64)> = BTreeMap::new();
    for r in &recorded {
        if let Some(pnl) = r.pnl_total {
            let key = (r.entry_time.year(), r.entry_time.month());
            let entry = monthly_map.entry(key).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += pnl;
        }
    }
    let monthly = monthly_map
        .into_iter()
        .map(|((year, month), (trades, total_pnl))| MonthlyPnl {
            year,
            month,
            trades,
            total_pnl,
        })
        .collect();

    BacktestSummary {
        total_trades: records.len(),
        recorded_trades: recorded.len(),
        failed_trades: records.len() - recorded.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate,
        total_pnl,
        total_spot_pnl: recorded.iter().filter_map(|r| r.spot_pnl).sum(),
        avg_pnl: mean(&pnls),
        avg_win: mean(&wins),
        avg_loss: mean(&losses),
        max_profit: extreme(&pnls, f64::NEG_INFINITY, f64::max),
        max_loss: extreme(&pnls, f64::INFINITY, f64::min),
        profit_factor,
        equity_curve,
        max_drawdown,
        monthly,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Best or worst element; 0.0 for an empty set so the seed never leaks out.
fn extreme(values: &[f64], seed: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(seed, pick)
    }
}
