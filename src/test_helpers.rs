use async_trait::async_trait;
use chrono::{NaiveDateTime, Weekday};

use crate::config::Config;
use crate::gateway::{GatewayError, MarketDataGateway, OptionQuery};
use crate::models::{DataInterval, Direction, Moneyness, PriceSample, PriceSeries, TradeSignal};

/// Parse "YYYY-MM-DD HH:MM" or "YYYY-MM-DD HH:MM:SS".
pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .unwrap()
}

pub fn sample_at(timestamp: &str, price: f64) -> PriceSample {
    PriceSample {
        timestamp: ts(timestamp),
        price,
    }
}

pub fn samples_from(data: &[(&str, f64)]) -> PriceSeries {
    PriceSeries::new(data.iter().map(|&(t, p)| sample_at(t, p)).collect())
}

/// Signal with the reference spot levels: entry 25550, exit 25600.
pub fn signal(trade_id: u32, side: Direction, entry: &str, exit: &str) -> TradeSignal {
    TradeSignal {
        trade_id,
        side,
        entry_time: ts(entry),
        exit_time: ts(exit),
        entry_spot: 25_550.0,
        exit_spot: 25_600.0,
    }
}

/// Thursday expiry, Tuesday rollover, ATM, lot 75 — the reference scenario.
pub fn default_test_config() -> Config {
    Config {
        underlying: "NSE_INDEX|Nifty 50".to_string(),
        lot_size: 75,
        expiry_weekday: Weekday::Thu,
        rollover_weekday: Weekday::Tue,
        moneyness: Moneyness::Atm,
        interval: DataInterval::M1,
        access_token: "test-token".to_string(),
        max_concurrent: 4,
        log_level: "error".to_string(),
    }
}

/// Gateway returning a canned quote series, with optional per-strike failure.
pub struct CannedGateway {
    quotes: Vec<(String, f64)>,
    fail_all: bool,
    fail_strike: Option<f64>,
}

impl CannedGateway {
    pub fn with_quotes(quotes: &[(&str, f64)]) -> Self {
        Self {
            quotes: quotes.iter().map(|&(t, p)| (t.to_string(), p)).collect(),
            fail_all: false,
            fail_strike: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            quotes: Vec::new(),
            fail_all: true,
            fail_strike: None,
        }
    }

    pub fn failing_for_strike(strike: f64, quotes: &[(&str, f64)]) -> Self {
        let mut gw = Self::with_quotes(quotes);
        gw.fail_strike = Some(strike);
        gw
    }
}

#[async_trait]
impl MarketDataGateway for CannedGateway {
    async fn fetch_prices(&self, query: &OptionQuery) -> Result<PriceSeries, GatewayError> {
        let strike_fails = self
            .fail_strike
            .map(|s| (s - query.strike).abs() < 0.01)
            .unwrap_or(false);
        if self.fail_all || strike_fails {
            return Err(GatewayError::NoInstrument {
                side: query.option_side,
                strike: query.strike,
                expiry: query.expiry_date,
            });
        }
        Ok(PriceSeries::new(
            self.quotes
                .iter()
                .map(|(t, p)| PriceSample {
                    timestamp: ts(t),
                    price: *p,
                })
                .collect(),
        ))
    }
}
