use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::backtest::matcher::closest_price;
use crate::backtest::metrics::{self, BacktestSummary};
use crate::config::{Config, ConfigError};
use crate::gateway::{GatewayError, MarketDataGateway, OptionQuery};
use crate::models::{OptionLeg, OptionSide, ResultRecord, TradeSignal, TradeStatus};
use crate::rules::{calculate_expiry, calculate_strike};

/// Recoverable per-trade failure; recorded with its reason and never fatal to
/// the batch.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid signal: {0}")]
    Validation(String),
    #[error("market data unavailable: {0}")]
    DataUnavailable(#[from] GatewayError),
    #[error("no matching sample ({0} leg)")]
    NoMatch(&'static str),
}

/// Per-trade processing stages. `Failed` is absorbing and reachable from any
/// of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradeState {
    Pending,
    Priced,
    Computed,
    Recorded,
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeState::Pending => write!(f, "pending"),
            TradeState::Priced => write!(f, "priced"),
            TradeState::Computed => write!(f, "computed"),
            TradeState::Recorded => write!(f, "recorded"),
        }
    }
}

/// Completed backtest: one record per input signal, in input order.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub records: Vec<ResultRecord>,
}

impl BacktestRun {
    pub fn summary(&self) -> BacktestSummary {
        metrics::summarize(&self.records)
    }
}

/// Converts trade signals into priced option legs and collects the results.
///
/// Trades are processed as independent tasks bounded by a worker pool sized
/// from the configuration; the gateway's own rate limiter spaces outbound
/// calls. Completions land in a pre-sized, index-addressed buffer so the
/// output always preserves input order regardless of completion order.
/// Dropping the returned future abandons in-flight fetches; no per-trade
/// retries happen here.
pub struct BacktestEngine {
    gateway: Arc<dyn MarketDataGateway>,
    config: Config,
}

impl BacktestEngine {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: Config) -> Self {
        Self { gateway, config }
    }

    pub async fn run(&self, signals: Vec<TradeSignal>) -> Result<BacktestRun, ConfigError> {
        self.config.validate()?;

        let total = signals.len();
        info!(
            "Backtest start: {} trades, {} {} {} lot={} workers={}",
            total,
            self.config.moneyness,
            self.config.expiry_weekday,
            self.config.interval,
            self.config.lot_size,
            self.config.max_concurrent,
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let progress = Arc::new(AtomicUsize::new(0));
        let mut tasks: JoinSet<(usize, ResultRecord)> = JoinSet::new();

        // Kept outside the tasks so a trade whose task dies can still be
        // reported as Failed in its slot.
        let originals = signals.clone();

        for (idx, signal) in signals.into_iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let config = self.config.clone();
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            idx,
                            ResultRecord::failed(&signal, "worker pool closed".to_string()),
                        )
                    }
                };

                let record = match process_signal(gateway.as_ref(), &config, &signal).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Trade {} failed: {}", signal.trade_id, e);
                        ResultRecord::failed(&signal, e.to_string())
                    }
                };

                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    "Trade {} {} ({}/{})",
                    signal.trade_id, record.status, done, total
                );
                (idx, record)
            });
        }

        let mut slots: Vec<Option<ResultRecord>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, record)) => slots[idx] = Some(record),
                Err(e) => warn!("Trade task aborted: {}", e),
            }
        }

        // Every signal ends up Recorded or Failed; a slot left empty by an
        // aborted task becomes a Failed record for its signal.
        let records: Vec<ResultRecord> = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    ResultRecord::failed(&originals[idx], "trade task aborted".to_string())
                })
            })
            .collect();
        let recorded = records.iter().filter(|r| r.status.is_recorded()).count();
        info!(
            "Backtest complete: {} recorded, {} failed",
            recorded,
            records.len() - recorded
        );

        Ok(BacktestRun { records })
    }
}

/// Run one signal through the pipeline: derive the contract, price both legs,
/// compute P&L. Errors bubble to the caller, which records them as `Failed`.
async fn process_signal(
    gateway: &dyn MarketDataGateway,
    config: &Config,
    signal: &TradeSignal,
) -> Result<ResultRecord, TradeError> {
    let mut state = TradeState::Pending;
    signal.validate().map_err(TradeError::Validation)?;

    // Contract selection is deterministic and cannot fail.
    let option_side = signal.side.option_side();
    let expiry_date = calculate_expiry(
        signal.entry_time,
        config.expiry_weekday,
        config.rollover_weekday,
    );
    let strike = calculate_strike(signal.entry_spot, option_side, config.moneyness);
    debug!(
        "Trade {}: {} {} exp {} strike {}",
        signal.trade_id, option_side, config.moneyness, expiry_date, strike
    );

    let entry_series = gateway
        .fetch_prices(&leg_query(
            config,
            expiry_date,
            strike,
            option_side,
            signal.entry_time,
        ))
        .await?;
    let exit_series = gateway
        .fetch_prices(&leg_query(
            config,
            expiry_date,
            strike,
            option_side,
            signal.exit_time,
        ))
        .await?;
    state = advance(signal.trade_id, state, TradeState::Priced);

    let entry = closest_price(&entry_series, signal.entry_time).ok_or(TradeError::NoMatch("entry"))?;
    let exit = closest_price(&exit_series, signal.exit_time).ok_or(TradeError::NoMatch("exit"))?;

    let leg = OptionLeg {
        trade_id: signal.trade_id,
        option_side,
        expiry_date,
        strike,
        entry_option_price: entry.price,
        exit_option_price: exit.price,
    };

    let sign = option_side.direction_sign();
    let pnl_per_unit = (leg.exit_option_price - leg.entry_option_price) * sign;
    let pnl_total = pnl_per_unit * config.lot_size as f64;
    let spot_pnl = (signal.exit_spot - signal.entry_spot) * sign;
    state = advance(signal.trade_id, state, TradeState::Computed);

    let record = ResultRecord {
        trade_id: signal.trade_id,
        option_side,
        entry_time: signal.entry_time,
        exit_time: signal.exit_time,
        entry_spot: signal.entry_spot,
        exit_spot: signal.exit_spot,
        expiry_date: Some(leg.expiry_date),
        strike: Some(leg.strike),
        entry_option_price: Some(leg.entry_option_price),
        exit_option_price: Some(leg.exit_option_price),
        pnl_per_unit: Some(pnl_per_unit),
        pnl_total: Some(pnl_total),
        spot_pnl: Some(spot_pnl),
        status: TradeStatus::Recorded,
    };
    advance(signal.trade_id, state, TradeState::Recorded);

    Ok(record)
}

fn advance(trade_id: u32, from: TradeState, to: TradeState) -> TradeState {
    debug!("Trade {}: {} -> {}", trade_id, from, to);
    to
}

/// Quote window for one leg: the trade date and the prior day, matching the
/// source archive's per-day candle granularity.
fn leg_query(
    config: &Config,
    expiry_date: NaiveDate,
    strike: f64,
    option_side: OptionSide,
    target: NaiveDateTime,
) -> OptionQuery {
    OptionQuery {
        underlying: config.underlying.clone(),
        expiry_date,
        strike,
        option_side,
        from_ts: target - ChronoDuration::days(1),
        to_ts: target,
        interval: config.interval,
    }
}
