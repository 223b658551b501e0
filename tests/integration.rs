use async_trait::async_trait;
use chrono::{NaiveDateTime, Weekday};
use std::collections::HashMap;
use std::sync::Arc;

use nifty_options_backtest::backtest::BacktestEngine;
use nifty_options_backtest::config::Config;
use nifty_options_backtest::gateway::{GatewayError, MarketDataGateway, OptionQuery};
use nifty_options_backtest::models::{
    DataInterval, Direction, Moneyness, OptionSide, PriceSample, PriceSeries, TradeSignal,
};

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

/// A mock gateway serving canned quote series keyed by strike, with a set of
/// strikes that always fail.
struct MockGateway {
    series: HashMap<i64, Vec<(NaiveDateTime, f64)>>,
    failing_strikes: Vec<i64>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            series: HashMap::new(),
            failing_strikes: Vec::new(),
        }
    }

    fn quotes(mut self, strike: i64, quotes: &[(&str, f64)]) -> Self {
        self.series
            .insert(strike, quotes.iter().map(|&(t, p)| (ts(t), p)).collect());
        self
    }

    fn failing(mut self, strike: i64) -> Self {
        self.failing_strikes.push(strike);
        self
    }
}

#[async_trait]
impl MarketDataGateway for MockGateway {
    async fn fetch_prices(&self, query: &OptionQuery) -> Result<PriceSeries, GatewayError> {
        let strike = query.strike as i64;
        if self.failing_strikes.contains(&strike) {
            return Err(GatewayError::NoInstrument {
                side: query.option_side,
                strike: query.strike,
                expiry: query.expiry_date,
            });
        }
        let quotes = self.series.get(&strike).cloned().unwrap_or_default();
        let samples = quotes
            .into_iter()
            .map(|(timestamp, price)| PriceSample { timestamp, price })
            .collect();
        let series = PriceSeries::new(samples);
        if series.is_empty() {
            return Err(GatewayError::NoCandles {
                from: query.from_ts,
                to: query.to_ts,
            });
        }
        Ok(series)
    }
}

fn reference_config() -> Config {
    Config {
        underlying: "NSE_INDEX|Nifty 50".to_string(),
        lot_size: 75,
        expiry_weekday: Weekday::Thu,
        rollover_weekday: Weekday::Tue,
        moneyness: Moneyness::Atm,
        interval: DataInterval::M1,
        access_token: String::new(),
        max_concurrent: 4,
        log_level: "error".to_string(),
    }
}

fn long_monday_signal() -> TradeSignal {
    TradeSignal {
        trade_id: 1,
        side: Direction::Long,
        entry_time: ts("2025-11-03 09:30"),
        exit_time: ts("2025-11-03 15:00"),
        entry_spot: 25_550.0,
        exit_spot: 25_600.0,
    }
}

#[tokio::test]
async fn reference_long_trade_end_to_end() {
    // Monday entry (weekday 0 < rollover Tuesday) -> current-week Thursday
    // expiry; long -> call; ATM strike = ceil(25550/50)*50 = 25550.
    let gateway = Arc::new(MockGateway::new().quotes(
        25_550,
        &[("2025-11-03 09:30", 210.0), ("2025-11-03 15:00", 225.0)],
    ));

    let engine = BacktestEngine::new(gateway, reference_config());
    let run = engine.run(vec![long_monday_signal()]).await.unwrap();

    assert_eq!(run.records.len(), 1);
    let r = &run.records[0];
    assert!(r.status.is_recorded());
    assert_eq!(r.option_side, OptionSide::Call);
    assert_eq!(r.expiry_date.map(|d| d.to_string()).as_deref(), Some("2025-11-06"));
    assert_eq!(r.strike, Some(25_550.0));
    assert_eq!(r.entry_option_price, Some(210.0));
    assert_eq!(r.exit_option_price, Some(225.0));
    assert_eq!(r.pnl_per_unit, Some(15.0));
    assert_eq!(r.pnl_total, Some(1_125.0));
}

#[tokio::test]
async fn unavailable_leg_fails_without_stopping_the_batch() {
    let gateway = Arc::new(
        MockGateway::new()
            .quotes(
                25_550,
                &[("2025-11-03 09:30", 210.0), ("2025-11-03 15:00", 225.0)],
            )
            .quotes(
                25_700,
                &[("2025-11-04 09:30", 180.0), ("2025-11-04 15:00", 160.0)],
            )
            .failing(25_600),
    );

    let failing = TradeSignal {
        trade_id: 2,
        side: Direction::Long,
        entry_time: ts("2025-11-03 10:00"),
        exit_time: ts("2025-11-03 14:00"),
        entry_spot: 25_580.0, // ATM call 25600 -> gateway unavailable
        exit_spot: 25_640.0,
    };
    let trailing = TradeSignal {
        trade_id: 3,
        side: Direction::Long,
        entry_time: ts("2025-11-04 09:30"),
        exit_time: ts("2025-11-04 15:00"),
        entry_spot: 25_660.0,
        exit_spot: 25_610.0,
    };

    let engine = BacktestEngine::new(gateway, reference_config());
    let run = engine
        .run(vec![long_monday_signal(), failing, trailing])
        .await
        .unwrap();

    assert_eq!(run.records.len(), 3);
    assert_eq!(
        run.records.iter().map(|r| r.trade_id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    assert!(run.records[0].status.is_recorded());
    assert!(!run.records[1].status.is_recorded());
    assert!(run.records[1].pnl_total.is_none());
    assert!(run.records[2].status.is_recorded());
    assert_eq!(run.records[2].pnl_total, Some(-20.0 * 75.0));

    let summary = run.summary();
    assert_eq!(summary.total_trades, 3);
    assert_eq!(summary.recorded_trades, 2);
    assert_eq!(summary.failed_trades, 1);
    assert_eq!(summary.winning_trades, 1);
    assert_eq!(summary.losing_trades, 1);
    assert!((summary.win_rate - 50.0).abs() < 1e-9);
    // Equity in input order: 1125, then 1125 - 1500.
    assert_eq!(summary.equity_curve, vec![1_125.0, -375.0]);
}

#[tokio::test]
async fn short_signal_trades_a_put_with_flipped_sign() {
    // Short -> put; ATM put = floor(25550/50)*50 = 25550. Tuesday entry with
    // Tuesday rollover pushes expiry to next week's Thursday.
    let gateway = Arc::new(MockGateway::new().quotes(
        25_550,
        &[("2025-11-04 09:30", 190.0), ("2025-11-04 15:00", 140.0)],
    ));

    let signal = TradeSignal {
        trade_id: 4,
        side: Direction::Short,
        entry_time: ts("2025-11-04 09:30"),
        exit_time: ts("2025-11-04 15:00"),
        entry_spot: 25_550.0,
        exit_spot: 25_480.0,
    };

    let engine = BacktestEngine::new(gateway, reference_config());
    let run = engine.run(vec![signal]).await.unwrap();

    let r = &run.records[0];
    assert!(r.status.is_recorded());
    assert_eq!(r.option_side, OptionSide::Put);
    assert_eq!(r.expiry_date.map(|d| d.to_string()).as_deref(), Some("2025-11-13"));
    // Put sign: (140 - 190) * -1 = +50 per unit.
    assert_eq!(r.pnl_per_unit, Some(50.0));
    assert_eq!(r.pnl_total, Some(3_750.0));
    assert_eq!(r.spot_pnl, Some(70.0));
}

#[tokio::test]
async fn concurrent_batch_preserves_order() {
    let mut gateway = MockGateway::new();
    let mut signals = Vec::new();
    for i in 0..20u32 {
        let strike = 25_000 + (i as i64) * 50;
        gateway = gateway.quotes(
            strike,
            &[("2025-11-03 09:30", 200.0), ("2025-11-03 15:00", 205.0)],
        );
        signals.push(TradeSignal {
            trade_id: i + 1,
            side: Direction::Long,
            entry_time: ts("2025-11-03 09:30"),
            exit_time: ts("2025-11-03 15:00"),
            entry_spot: strike as f64, // exact multiple: ATM call = spot
            exit_spot: strike as f64 + 10.0,
        });
    }

    let mut cfg = reference_config();
    cfg.max_concurrent = 8;
    let engine = BacktestEngine::new(Arc::new(gateway), cfg);
    let run = engine.run(signals).await.unwrap();

    assert_eq!(run.records.len(), 20);
    assert_eq!(
        run.records.iter().map(|r| r.trade_id).collect::<Vec<_>>(),
        (1..=20).collect::<Vec<_>>()
    );
    assert!(run.records.iter().all(|r| r.status.is_recorded()));
}
