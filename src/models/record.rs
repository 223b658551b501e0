use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{OptionSide, TradeSignal};

/// Final disposition of one trade. Every signal ends in exactly one of these;
/// failures carry the reason that stopped processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Recorded,
    Failed { reason: String },
}

impl TradeStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, TradeStatus::Recorded)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Recorded => write!(f, "recorded"),
            TradeStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// One row of backtest output: the derived option leg plus computed P&L, or a
/// failure annotation. Created once per signal, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub trade_id: u32,
    pub option_side: OptionSide,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_spot: f64,
    pub exit_spot: f64,
    pub expiry_date: Option<NaiveDate>,
    pub strike: Option<f64>,
    pub entry_option_price: Option<f64>,
    pub exit_option_price: Option<f64>,
    pub pnl_per_unit: Option<f64>,
    pub pnl_total: Option<f64>,
    pub spot_pnl: Option<f64>,
    pub status: TradeStatus,
}

impl ResultRecord {
    /// Null-priced record for a trade that failed before pricing completed.
    pub fn failed(signal: &TradeSignal, reason: String) -> Self {
        Self {
            trade_id: signal.trade_id,
            option_side: signal.side.option_side(),
            entry_time: signal.entry_time,
            exit_time: signal.exit_time,
            entry_spot: signal.entry_spot,
            exit_spot: signal.exit_spot,
            expiry_date: None,
            strike: None,
            entry_option_price: None,
            exit_option_price: None,
            pnl_per_unit: None,
            pnl_total: None,
            spot_pnl: None,
            status: TradeStatus::Failed { reason },
        }
    }
}
